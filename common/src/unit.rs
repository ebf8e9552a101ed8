//! Marker types.

/// Marker type describing an entity being published for browsing.
#[derive(Clone, Copy, Debug)]
pub struct Publication;
