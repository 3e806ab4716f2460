//! Reading order of annotations
//!
//! Annotations are grouped by ascending page number and, within a page, ordered by
//! how high they sit once the page's display rotation is applied. Each annotation's
//! two diagonal corners are rotated about the page center and the smaller rotated
//! `y` becomes its effective top.
//!
//! Page metadata is passed in explicitly through [`PageMetadataProvider`]; nothing in
//! this module keeps state between calls.

use doc_model::{
    Annotation, MissingPagePolicy, PageMetadataProvider, PageRotation, PageSize, Rect,
};
use ordered_float::OrderedFloat;
use std::cmp::Ordering;
use tracing::{debug, trace};

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum OrderError {
    #[error("page {page} has invalid rotation code {code}: expected 0, 1, 2 or 3")]
    InvalidRotation { page: u32, code: i32 },
    #[error("page {page} not found (page_count={page_count})")]
    PageNotFound { page: u32, page_count: u32 },
}

pub type OrderResult<T> = Result<T, OrderError>;

/// Anything anchored to a page by a box in unrotated page coordinates.
pub trait Positioned {
    /// 1-based page number
    fn page_number(&self) -> u32;
    fn bounds(&self) -> Rect;
}

impl Positioned for Annotation {
    fn page_number(&self) -> u32 {
        self.page
    }

    fn bounds(&self) -> Rect {
        self.rect
    }
}

impl<T: Positioned + ?Sized> Positioned for &T {
    fn page_number(&self) -> u32 {
        (**self).page_number()
    }

    fn bounds(&self) -> Rect {
        (**self).bounds()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ReadingOrderOptions {
    pub missing_page: MissingPagePolicy,
}

impl ReadingOrderOptions {
    pub fn strict() -> Self {
        Self { missing_page: MissingPagePolicy::Reject }
    }
}

/// Rotate `(x, y)` about `center` by `radians`.
pub fn rotate_about(center: (f64, f64), point: (f64, f64), radians: f64) -> (f64, f64) {
    let (cx, cy) = center;
    let (x, y) = point;
    let (s, c) = radians.sin_cos();

    let nx = c * (x - cx) + s * (y - cy) + cx;
    let ny = c * (y - cy) - s * (x - cx) + cy;
    (nx, ny)
}

/// Geometry of one page as needed for ordering.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageFrame {
    pub center: (f64, f64),
    pub rotation: PageRotation,
}

impl PageFrame {
    pub fn resolve<P>(pages: &P, page: u32, options: ReadingOrderOptions) -> OrderResult<Self>
    where
        P: PageMetadataProvider + ?Sized,
    {
        let code = pages.rotation_code(page);
        let rotation =
            PageRotation::try_from(code).map_err(|_| OrderError::InvalidRotation { page, code })?;

        let page_count = pages.page_count();
        let size = match pages.page_size(page).filter(|_| page <= page_count) {
            Some(size) => size,
            None => match options.missing_page {
                MissingPagePolicy::ZeroSized => {
                    debug!(page, page_count, "page metadata missing, using zero-sized page");
                    PageSize::ZERO
                }
                MissingPagePolicy::Reject => {
                    return Err(OrderError::PageNotFound { page, page_count });
                }
            },
        };

        Ok(Self { center: size.center(), rotation })
    }

    /// Topmost `y` of `rect` once the page rotation is applied.
    pub fn effective_top(&self, rect: &Rect) -> f64 {
        let radians = self.rotation.radians();
        let (_, top_a) = rotate_about(self.center, rect.origin(), radians);
        let (_, top_b) = rotate_about(self.center, rect.far_corner(), radians);
        top_a.min(top_b)
    }
}

pub fn effective_top<T, P>(item: &T, pages: &P, options: ReadingOrderOptions) -> OrderResult<f64>
where
    T: Positioned + ?Sized,
    P: PageMetadataProvider + ?Sized,
{
    let frame = PageFrame::resolve(pages, item.page_number(), options)?;
    Ok(frame.effective_top(&item.bounds()))
}

/// Signed reading-order difference between `a` and `b`.
///
/// Negative when `a` reads first. Records on different pages compare by page number
/// alone; no page metadata is consulted for them.
pub fn reading_order_delta<T, P>(
    a: &T,
    b: &T,
    pages: &P,
    options: ReadingOrderOptions,
) -> OrderResult<f64>
where
    T: Positioned + ?Sized,
    P: PageMetadataProvider + ?Sized,
{
    let (page_a, page_b) = (a.page_number(), b.page_number());
    if page_a != page_b {
        return Ok(f64::from(page_a) - f64::from(page_b));
    }

    let frame = PageFrame::resolve(pages, page_a, options)?;
    Ok(frame.effective_top(&a.bounds()) - frame.effective_top(&b.bounds()))
}

/// [`reading_order_delta`] as an [`Ordering`].
pub fn compare_reading_order<T, P>(
    a: &T,
    b: &T,
    pages: &P,
    options: ReadingOrderOptions,
) -> OrderResult<Ordering>
where
    T: Positioned + ?Sized,
    P: PageMetadataProvider + ?Sized,
{
    let delta = reading_order_delta(a, b, pages, options)?;
    Ok(OrderedFloat(delta).cmp(&OrderedFloat(0.0)))
}

/// Sort key equivalent to the pairwise comparison: page first, then effective top.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct ReadingKey {
    pub page: u32,
    pub top: OrderedFloat<f64>,
}

pub fn reading_key<T, P>(
    item: &T,
    pages: &P,
    options: ReadingOrderOptions,
) -> OrderResult<ReadingKey>
where
    T: Positioned + ?Sized,
    P: PageMetadataProvider + ?Sized,
{
    Ok(ReadingKey {
        page: item.page_number(),
        top: OrderedFloat(effective_top(item, pages, options)?),
    })
}

/// Sort `items` into reading order.
///
/// Keys are computed once per item and the sort is stable, so items with equal
/// keys keep their input order. Fails before reordering anything if any page has an
/// invalid rotation or, under [`MissingPagePolicy::Reject`], is missing.
pub fn sort_in_reading_order<T, P>(
    items: Vec<T>,
    pages: &P,
    options: ReadingOrderOptions,
) -> OrderResult<Vec<T>>
where
    T: Positioned,
    P: PageMetadataProvider + ?Sized,
{
    let mut keyed = items
        .into_iter()
        .map(|item| reading_key(&item, pages, options).map(|key| (key, item)))
        .collect::<OrderResult<Vec<_>>>()?;

    keyed.sort_by_key(|(key, _)| *key);
    trace!(count = keyed.len(), "sorted annotations into reading order");

    Ok(keyed.into_iter().map(|(_, item)| item).collect())
}
