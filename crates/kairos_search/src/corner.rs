//! Analysis corners and path analysis points.
//!
//! A path analysis point is one (corner, min/max) pair; every arrival and
//! required time is computed per analysis point. Delay calculation is keyed
//! by the same dense index.

use kairos_common::{Ident, MinMax};

/// Dense index of a [`PathAnalysisPt`].
pub type PathApIndex = u32;

/// One process/voltage/temperature corner.
#[derive(Debug, Clone)]
pub struct Corner {
    /// The corner's name.
    pub name: Ident,
    /// Dense corner index.
    pub index: usize,
}

/// One (corner, min/max) analysis point.
#[derive(Debug, Clone, Copy)]
pub struct PathAnalysisPt {
    /// Dense index of this analysis point.
    pub index: PathApIndex,
    /// The corner this point analyzes.
    pub corner: usize,
    /// The analysis direction.
    pub min_max: MinMax,
}

impl PathAnalysisPt {
    /// The delay-calculation index for this analysis point. One delay
    /// calculation context per analysis point.
    pub fn dcalc_index(&self) -> usize {
        self.index as usize
    }
}

/// The set of corners and their analysis points.
#[derive(Debug, Clone)]
pub struct Corners {
    corners: Vec<Corner>,
    path_aps: Vec<PathAnalysisPt>,
}

impl Corners {
    /// Creates corners with the given names; each gets a min and a max
    /// analysis point, interleaved per corner.
    pub fn new(names: Vec<Ident>) -> Self {
        let corners: Vec<Corner> = names
            .into_iter()
            .enumerate()
            .map(|(index, name)| Corner { name, index })
            .collect();
        let mut path_aps = Vec::with_capacity(corners.len() * MinMax::COUNT);
        for corner in &corners {
            for min_max in MinMax::BOTH {
                path_aps.push(PathAnalysisPt {
                    index: path_aps.len() as PathApIndex,
                    corner: corner.index,
                    min_max,
                });
            }
        }
        Self { corners, path_aps }
    }

    /// A single-corner configuration.
    pub fn single(name: Ident) -> Self {
        Self::new(vec![name])
    }

    /// All corners.
    pub fn corners(&self) -> &[Corner] {
        &self.corners
    }

    /// All analysis points, in dense-index order.
    pub fn path_aps(&self) -> &[PathAnalysisPt] {
        &self.path_aps
    }

    /// The analysis point with the given index.
    pub fn path_ap(&self, index: PathApIndex) -> &PathAnalysisPt {
        &self.path_aps[index as usize]
    }

    /// The analysis point of (corner, min/max).
    pub fn find_path_ap(&self, corner: usize, min_max: MinMax) -> &PathAnalysisPt {
        &self.path_aps[corner * MinMax::COUNT + min_max.index()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kairos_common::Interner;

    #[test]
    fn single_corner_has_two_aps() {
        let interner = Interner::new();
        let corners = Corners::single(interner.intern("typ"));
        assert_eq!(corners.corners().len(), 1);
        assert_eq!(corners.path_aps().len(), 2);
        assert_eq!(corners.find_path_ap(0, MinMax::Max).min_max, MinMax::Max);
        assert_eq!(corners.find_path_ap(0, MinMax::Min).min_max, MinMax::Min);
    }

    #[test]
    fn indices_are_dense_and_stable() {
        let interner = Interner::new();
        let corners = Corners::new(vec![interner.intern("fast"), interner.intern("slow")]);
        assert_eq!(corners.path_aps().len(), 4);
        for (i, ap) in corners.path_aps().iter().enumerate() {
            assert_eq!(ap.index as usize, i);
            assert_eq!(corners.path_ap(ap.index).index, ap.index);
            assert_eq!(ap.dcalc_index(), i);
        }
    }

    #[test]
    fn find_path_ap_roundtrip() {
        let interner = Interner::new();
        let corners = Corners::new(vec![interner.intern("fast"), interner.intern("slow")]);
        let ap = corners.find_path_ap(1, MinMax::Min);
        assert_eq!(ap.corner, 1);
        assert_eq!(ap.min_max, MinMax::Min);
    }
}
