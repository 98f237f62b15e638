// Adapters layer: concrete implementations for external collaborators
// (snapshot sources, HTML roster extraction, record emitters).

pub mod emitter;
pub mod html_roster;
pub mod snapshot_source;
