use skel3d_core::Skeleton;

use super::Overlay;

/// Output of one detection call.
#[derive(Clone, Debug)]
pub struct Detection {
    /// One skeleton per active person slot, in slot order.
    pub skeletons: Vec<Skeleton>,
    /// Present only when visualisation was requested.
    pub overlay: Option<Overlay>,
}

impl Detection {
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.skeletons.is_empty()
    }

    /// Skeletons with orientation data stripped.
    pub fn bare_skeletons(&self) -> Vec<Skeleton> {
        self.skeletons.iter().map(Skeleton::make_bare).collect()
    }
}
