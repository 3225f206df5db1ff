use gtfs_model::GtfsColor;

use crate::feed::{GtfsFeed, ROUTES_FILE};
use crate::{FeedIndices, NoticeContainer, NoticeSeverity, ValidationContext, ValidationNotice};
use crate::{Validator, ValidatorCategory};

const CODE_ROUTE_COLOR_CONTRAST: &str = "route_color_contrast";
const CODE_SIMILAR_COLORS: &str = "similar_colors";

/// WCAG contrast ratio between two colors' relative luminance, the same
/// formula the accessibility guidelines use for text-on-background contrast.
fn contrast_ratio(a: GtfsColor, b: GtfsColor) -> f64 {
    let (l1, l2) = (a.relative_luminance(), b.relative_luminance());
    let (lighter, darker) = if l1 >= l2 { (l1, l2) } else { (l2, l1) };
    (lighter + 0.05) / (darker + 0.05)
}

/// Checks `route_color`/`route_text_color` against the WCAG contrast ratio.
/// Below 3.0 the text is genuinely unreadable (ERROR); between 3.0 and 4.5 it
/// is legible but substandard (WARNING). Equal colors additionally get their
/// own `similar_colors` notice alongside the contrast-ratio one — "identical"
/// is a distinct defect from "low contrast", not a replacement for it.
#[derive(Debug, Default)]
pub struct RouteColorContrastValidator;

impl Validator for RouteColorContrastValidator {
    fn name(&self) -> &'static str {
        CODE_ROUTE_COLOR_CONTRAST
    }

    fn category(&self) -> ValidatorCategory {
        ValidatorCategory::Business
    }

    fn validate(
        &self,
        feed: &GtfsFeed,
        _indices: &FeedIndices,
        _ctx: &ValidationContext,
        notices: &NoticeContainer,
    ) {
        for (row, route) in feed.routes.iter_with_row() {
            let background = route.route_color.unwrap_or_else(|| GtfsColor::new(0xFF, 0xFF, 0xFF));
            let text = route.route_text_color.unwrap_or_else(|| GtfsColor::new(0, 0, 0));

            if background == text {
                let mut notice = ValidationNotice::new(
                    CODE_SIMILAR_COLORS,
                    NoticeSeverity::Error,
                    format!("route {:?} uses the same color for route_color and route_text_color", route.route_id),
                );
                notice.file = Some(ROUTES_FILE.to_string());
                notice.row = Some(row);
                notice.insert_context_field("routeId", &route.route_id);
                notices.push(notice);
                // Identical colors are also, trivially, indistinguishable
                // contrast-wise: fall through so the contrast-ratio check
                // below fires too instead of short-circuiting it.
            }

            let ratio = contrast_ratio(background, text);
            if ratio < 3.0 {
                let mut notice = ValidationNotice::new(
                    CODE_ROUTE_COLOR_CONTRAST,
                    NoticeSeverity::Error,
                    format!("route {:?} text/background contrast ratio is {ratio:.2}, below the minimum readable threshold", route.route_id),
                );
                notice.file = Some(ROUTES_FILE.to_string());
                notice.row = Some(row);
                notice.insert_context_field("routeId", &route.route_id);
                notice.insert_context_field("contrastRatio", ratio);
                notices.push(notice);
            } else if ratio < 4.5 {
                let mut notice = ValidationNotice::new(
                    CODE_ROUTE_COLOR_CONTRAST,
                    NoticeSeverity::Warning,
                    format!("route {:?} text/background contrast ratio is {ratio:.2}, below the recommended WCAG AA threshold", route.route_id),
                );
                notice.file = Some(ROUTES_FILE.to_string());
                notice.row = Some(row);
                notice.insert_context_field("routeId", &route.route_id);
                notice.insert_context_field("contrastRatio", ratio);
                notices.push(notice);
            }
        }
    }
}
