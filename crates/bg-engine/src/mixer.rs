//! Mute/solo/volume resolution.
//!
//! Track gain is derived, not stored: the project holds the user's
//! volume, mute, and solo flags, and the mixer maps those to the gain
//! applied at each channel's output node. Any mute/solo edit recomputes
//! every track, since soloing one track silences all the others.

use bg_ir::{Project, Track};
use log::trace;

use crate::channel::ChannelRack;
use crate::graph::AudioGraph;

/// The gain a track's output node should carry right now.
///
/// Muted tracks are silent. When any track is soloed, only soloed
/// tracks sound. Mute wins over solo on the same track.
pub fn effective_gain(track: &Track, any_solo: bool) -> f32 {
    if track.muted {
        return 0.0;
    }
    if any_solo && !track.solo {
        return 0.0;
    }
    track.volume
}

/// Push every track's effective gain to its channel output, smoothed.
///
/// Tracks without a channel yet are skipped; they pick up the right
/// gain when their channel is created and this runs again.
pub fn recompute_track_gains(rack: &ChannelRack, graph: &mut AudioGraph, project: &Project) {
    let any_solo = project.any_solo();
    for track in &project.tracks {
        let gain = effective_gain(track, any_solo);
        trace!("track {} gain -> {gain}", track.id);
        rack.set_track_gain(graph, track.id, gain);
    }
}
