//! Page metadata as seen by annotation ordering.
//!
//! Page numbers are 1-based throughout. Sizes are unrotated; the display rotation is
//! reported separately as a quarter-turn code, the way a viewer tracks it apart from
//! the document.

use crate::ModelError;
use serde::{Deserialize, Serialize};
use std::f64::consts::FRAC_PI_2;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PageSize {
    pub width: f64,
    pub height: f64,
}

impl PageSize {
    pub const ZERO: PageSize = PageSize { width: 0.0, height: 0.0 };

    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    pub fn center(&self) -> (f64, f64) {
        (self.width / 2.0, self.height / 2.0)
    }
}

impl Default for PageSize {
    fn default() -> Self {
        Self { width: 612.0, height: 792.0 }
    }
}

/// Clockwise quarter-turn applied to a page when displayed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PageRotation {
    #[default]
    Deg0,
    Deg90,
    Deg180,
    Deg270,
}

impl PageRotation {
    pub fn code(self) -> i32 {
        match self {
            PageRotation::Deg0 => 0,
            PageRotation::Deg90 => 1,
            PageRotation::Deg180 => 2,
            PageRotation::Deg270 => 3,
        }
    }

    /// Angle that maps page-local coordinates into their displayed orientation.
    pub fn radians(self) -> f64 {
        f64::from(4 - self.code()) * FRAC_PI_2
    }

    /// Normalise a `/Rotate`-style angle. Only multiples of 90 are accepted.
    pub fn from_degrees(degrees: i64) -> Result<Self, ModelError> {
        if degrees % 90 != 0 {
            return Err(ModelError::InvalidRotationDegrees(degrees));
        }
        let code = (degrees / 90).rem_euclid(4) as i32;
        Self::try_from(code)
    }
}

impl TryFrom<i32> for PageRotation {
    type Error = ModelError;

    fn try_from(code: i32) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(PageRotation::Deg0),
            1 => Ok(PageRotation::Deg90),
            2 => Ok(PageRotation::Deg180),
            3 => Ok(PageRotation::Deg270),
            other => Err(ModelError::InvalidRotation(other)),
        }
    }
}

/// What ordering does with a page number beyond the document's page count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MissingPagePolicy {
    /// Treat the page as zero-sized, centred on the origin.
    #[default]
    ZeroSized,
    /// Fail the comparison.
    Reject,
}

/// Read access to per-page metadata.
///
/// `rotation_code` returns the raw quarter-turn code so callers decide how to treat
/// values outside `0..=3`.
pub trait PageMetadataProvider {
    fn page_count(&self) -> u32;

    /// Unrotated size of `page_number`, `None` when the document does not have it.
    fn page_size(&self, page_number: u32) -> Option<PageSize>;

    fn rotation_code(&self, page_number: u32) -> i32;
}

impl<P: PageMetadataProvider + ?Sized> PageMetadataProvider for &P {
    fn page_count(&self) -> u32 {
        (**self).page_count()
    }

    fn page_size(&self, page_number: u32) -> Option<PageSize> {
        (**self).page_size(page_number)
    }

    fn rotation_code(&self, page_number: u32) -> i32 {
        (**self).rotation_code(page_number)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PageRecord {
    pub width: f64,
    pub height: f64,
    #[serde(default)]
    pub rotation: i32,
}

impl PageRecord {
    pub fn new(width: f64, height: f64, rotation: i32) -> Self {
        Self { width, height, rotation }
    }
}

/// In-memory page list; index 0 holds page 1.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PageTable {
    pages: Vec<PageRecord>,
}

impl PageTable {
    pub fn new(pages: Vec<PageRecord>) -> Self {
        Self { pages }
    }

    pub fn pages(&self) -> &[PageRecord] {
        &self.pages
    }

    fn record(&self, page_number: u32) -> Option<&PageRecord> {
        let index = page_number.checked_sub(1)?;
        self.pages.get(index as usize)
    }
}

impl PageMetadataProvider for PageTable {
    fn page_count(&self) -> u32 {
        self.pages.len() as u32
    }

    fn page_size(&self, page_number: u32) -> Option<PageSize> {
        self.record(page_number).map(|page| PageSize::new(page.width, page.height))
    }

    fn rotation_code(&self, page_number: u32) -> i32 {
        self.record(page_number).map_or(0, |page| page.rotation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    #[test]
    fn rotation_codes_round_trip() {
        for code in 0..4 {
            let rotation = PageRotation::try_from(code).expect("valid code");
            assert_eq!(rotation.code(), code);
        }
        assert!(matches!(PageRotation::try_from(4), Err(ModelError::InvalidRotation(4))));
        assert!(matches!(PageRotation::try_from(-1), Err(ModelError::InvalidRotation(-1))));
    }

    #[test]
    fn radians_follow_quarter_turns() {
        assert!((PageRotation::Deg0.radians() - 2.0 * PI).abs() < 1e-12);
        assert!((PageRotation::Deg90.radians() - 1.5 * PI).abs() < 1e-12);
        assert!((PageRotation::Deg180.radians() - PI).abs() < 1e-12);
        assert!((PageRotation::Deg270.radians() - 0.5 * PI).abs() < 1e-12);
    }

    #[test]
    fn degrees_are_normalised() {
        assert_eq!(PageRotation::from_degrees(0).expect("valid"), PageRotation::Deg0);
        assert_eq!(PageRotation::from_degrees(450).expect("valid"), PageRotation::Deg90);
        assert_eq!(PageRotation::from_degrees(-90).expect("valid"), PageRotation::Deg270);
        assert!(matches!(
            PageRotation::from_degrees(45),
            Err(ModelError::InvalidRotationDegrees(45))
        ));
    }

    #[test]
    fn page_table_is_one_based() {
        let table = PageTable::new(vec![PageRecord::new(100.0, 200.0, 2)]);

        assert_eq!(table.page_count(), 1);
        assert_eq!(table.page_size(1), Some(PageSize::new(100.0, 200.0)));
        assert_eq!(table.rotation_code(1), 2);
        assert_eq!(table.page_size(0), None);
        assert_eq!(table.page_size(2), None);
        assert_eq!(table.rotation_code(2), 0);
    }
}
