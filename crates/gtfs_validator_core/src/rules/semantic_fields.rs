use url::Url;

use crate::feed::{AGENCY_FILE, FEED_INFO_FILE, ROUTES_FILE, STOPS_FILE};
use crate::{FeedIndices, GtfsFeed, NoticeContainer, NoticeSeverity, ValidationContext, ValidationNotice};
use crate::{Validator, ValidatorCategory};

const CODE_INVALID_URL: &str = "invalid_url";
const CODE_INVALID_EMAIL: &str = "invalid_email";
const CODE_INVALID_PHONE_NUMBER: &str = "invalid_phone_number";
const CODE_INVALID_TIMEZONE: &str = "invalid_timezone";
const CODE_INVALID_LANGUAGE_CODE: &str = "invalid_language_code";
const CODE_INVALID_CURRENCY: &str = "invalid_currency";
const CODE_INVALID_CURRENCY_AMOUNT: &str = "invalid_currency_amount";

fn field_notice(code: &str, severity: NoticeSeverity, file: &str, field: &str, row: u64, value: &str, message: String) -> ValidationNotice {
    let mut notice = ValidationNotice::new(code, severity, message);
    notice.file = Some(file.to_string());
    notice.field = Some(field.to_string());
    notice.row = Some(row);
    notice.insert_context_field("filename", file);
    notice.insert_context_field("fieldName", field);
    notice.insert_context_field("csvRowNumber", row);
    notice.insert_context_field("fieldValue", value);
    notice
}

/// Checks every `*_url` column the feed defines for well-formed absolute
/// URLs, generalizing the teacher's one-validator-per-field `url_syntax`
/// check over the file set this implementation carries.
#[derive(Debug, Default)]
pub struct InvalidUrlValidator;

impl Validator for InvalidUrlValidator {
    fn name(&self) -> &'static str {
        CODE_INVALID_URL
    }

    fn category(&self) -> ValidatorCategory {
        ValidatorCategory::Semantic
    }

    fn validate(&self, feed: &GtfsFeed, _indices: &FeedIndices, _ctx: &ValidationContext, notices: &NoticeContainer) {
        let mut check = |file: &str, field: &str, row: u64, value: &str| {
            let trimmed = value.trim();
            if trimmed.is_empty() {
                return;
            }
            if Url::parse(trimmed).is_err() {
                notices.push(field_notice(
                    CODE_INVALID_URL,
                    NoticeSeverity::Error,
                    file,
                    field,
                    row,
                    trimmed,
                    format!("{trimmed:?} is not a valid URL"),
                ));
            }
        };

        for (row, agency) in feed.agency.iter_with_row() {
            check(AGENCY_FILE, "agency_url", row, &agency.agency_url);
            if let Some(url) = &agency.agency_fare_url {
                check(AGENCY_FILE, "agency_fare_url", row, url);
            }
        }
        for (row, stop) in feed.stops.iter_with_row() {
            if let Some(url) = &stop.stop_url {
                check(STOPS_FILE, "stop_url", row, url);
            }
        }
        for (row, route) in feed.routes.iter_with_row() {
            if let Some(url) = &route.route_url {
                check(ROUTES_FILE, "route_url", row, url);
            }
        }
        if let Some(feed_info) = &feed.feed_info {
            for (row, info) in feed_info.iter_with_row() {
                check(FEED_INFO_FILE, "feed_publisher_url", row, &info.feed_publisher_url);
                if let Some(url) = &info.feed_contact_url {
                    check(FEED_INFO_FILE, "feed_contact_url", row, url);
                }
            }
        }
    }
}

/// RFC 5322 is far too permissive to re-implement faithfully; this checks
/// the one structural property every valid address has (exactly one `@`
/// with non-empty local and domain parts), which is what the teacher's
/// feed-level email checks actually gate on.
fn looks_like_email(value: &str) -> bool {
    let mut parts = value.splitn(2, '@');
    match (parts.next(), parts.next()) {
        (Some(local), Some(domain)) => {
            !local.is_empty() && !domain.is_empty() && domain.contains('.') && !domain.contains(' ')
        }
        _ => false,
    }
}

#[derive(Debug, Default)]
pub struct InvalidEmailValidator;

impl Validator for InvalidEmailValidator {
    fn name(&self) -> &'static str {
        CODE_INVALID_EMAIL
    }

    fn category(&self) -> ValidatorCategory {
        ValidatorCategory::Semantic
    }

    fn validate(&self, feed: &GtfsFeed, _indices: &FeedIndices, _ctx: &ValidationContext, notices: &NoticeContainer) {
        for (row, agency) in feed.agency.iter_with_row() {
            if let Some(email) = &agency.agency_email {
                let trimmed = email.trim();
                if !trimmed.is_empty() && !looks_like_email(trimmed) {
                    notices.push(field_notice(
                        CODE_INVALID_EMAIL,
                        NoticeSeverity::Error,
                        AGENCY_FILE,
                        "agency_email",
                        row,
                        trimmed,
                        format!("{trimmed:?} is not a valid email address"),
                    ));
                }
            }
        }
        if let Some(feed_info) = &feed.feed_info {
            for (row, info) in feed_info.iter_with_row() {
                if let Some(email) = &info.feed_contact_email {
                    let trimmed = email.trim();
                    if !trimmed.is_empty() && !looks_like_email(trimmed) {
                        notices.push(field_notice(
                            CODE_INVALID_EMAIL,
                            NoticeSeverity::Error,
                            FEED_INFO_FILE,
                            "feed_contact_email",
                            row,
                            trimmed,
                            format!("{trimmed:?} is not a valid email address"),
                        ));
                    }
                }
            }
        }
    }
}

/// Gated on `country_code` since phone number shape is locale-dependent;
/// without a country code this validator is a no-op rather than guessing.
/// When a country is configured, requires at least one ASCII digit and
/// rejects alphabetic characters outside a small set of separators.
#[derive(Debug, Default)]
pub struct InvalidPhoneNumberValidator;

impl Validator for InvalidPhoneNumberValidator {
    fn name(&self) -> &'static str {
        CODE_INVALID_PHONE_NUMBER
    }

    fn category(&self) -> ValidatorCategory {
        ValidatorCategory::Semantic
    }

    fn validate(&self, feed: &GtfsFeed, _indices: &FeedIndices, ctx: &ValidationContext, notices: &NoticeContainer) {
        if ctx.country_code.is_none() {
            return;
        }
        for (row, agency) in feed.agency.iter_with_row() {
            if let Some(phone) = &agency.agency_phone {
                let trimmed = phone.trim();
                if trimmed.is_empty() {
                    continue;
                }
                let digit_count = trimmed.chars().filter(|c| c.is_ascii_digit()).count();
                let has_invalid_char = trimmed
                    .chars()
                    .any(|c| !(c.is_ascii_digit() || matches!(c, '+' | '-' | ' ' | '(' | ')' | '.')));
                if digit_count < 7 || has_invalid_char {
                    notices.push(field_notice(
                        CODE_INVALID_PHONE_NUMBER,
                        NoticeSeverity::Warning,
                        AGENCY_FILE,
                        "agency_phone",
                        row,
                        trimmed,
                        format!("{trimmed:?} does not look like a valid phone number"),
                    ));
                }
            }
        }
    }
}

/// IANA tz database names are `Area/Location[/Location]`; this checks shape
/// rather than membership in a fixed, ever-changing tz database.
fn looks_like_iana_timezone(value: &str) -> bool {
    value == "UTC"
        || (value.contains('/')
            && value
                .split('/')
                .all(|segment| !segment.is_empty() && segment.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-' || c == '+')))
}

#[derive(Debug, Default)]
pub struct InvalidTimezoneValidator;

impl Validator for InvalidTimezoneValidator {
    fn name(&self) -> &'static str {
        CODE_INVALID_TIMEZONE
    }

    fn category(&self) -> ValidatorCategory {
        ValidatorCategory::Semantic
    }

    fn validate(&self, feed: &GtfsFeed, _indices: &FeedIndices, _ctx: &ValidationContext, notices: &NoticeContainer) {
        for (row, agency) in feed.agency.iter_with_row() {
            let tz = agency.agency_timezone.trim();
            if !tz.is_empty() && !looks_like_iana_timezone(tz) {
                notices.push(field_notice(
                    CODE_INVALID_TIMEZONE,
                    NoticeSeverity::Error,
                    AGENCY_FILE,
                    "agency_timezone",
                    row,
                    tz,
                    format!("{tz:?} is not a valid IANA timezone name"),
                ));
            }
        }
        for (row, stop) in feed.stops.iter_with_row() {
            if let Some(tz) = &stop.stop_timezone {
                let tz = tz.trim();
                if !tz.is_empty() && !looks_like_iana_timezone(tz) {
                    notices.push(field_notice(
                        CODE_INVALID_TIMEZONE,
                        NoticeSeverity::Error,
                        STOPS_FILE,
                        "stop_timezone",
                        row,
                        tz,
                        format!("{tz:?} is not a valid IANA timezone name"),
                    ));
                }
            }
        }
    }
}

/// BCP 47 language tags: `lang[-region][-variant...]`, each subtag
/// alphanumeric. `mul` (multiple languages) is accepted per GTFS convention.
fn looks_like_language_code(value: &str) -> bool {
    value.eq_ignore_ascii_case("mul")
        || value
            .split('-')
            .all(|subtag| !subtag.is_empty() && subtag.chars().all(|c| c.is_ascii_alphanumeric()))
}

#[derive(Debug, Default)]
pub struct InvalidLanguageCodeValidator;

impl Validator for InvalidLanguageCodeValidator {
    fn name(&self) -> &'static str {
        CODE_INVALID_LANGUAGE_CODE
    }

    fn category(&self) -> ValidatorCategory {
        ValidatorCategory::Semantic
    }

    fn validate(&self, feed: &GtfsFeed, _indices: &FeedIndices, _ctx: &ValidationContext, notices: &NoticeContainer) {
        for (row, agency) in feed.agency.iter_with_row() {
            if let Some(lang) = &agency.agency_lang {
                let trimmed = lang.trim();
                if !trimmed.is_empty() && !looks_like_language_code(trimmed) {
                    notices.push(field_notice(
                        CODE_INVALID_LANGUAGE_CODE,
                        NoticeSeverity::Error,
                        AGENCY_FILE,
                        "agency_lang",
                        row,
                        trimmed,
                        format!("{trimmed:?} is not a valid BCP 47 language code"),
                    ));
                }
            }
        }
        if let Some(feed_info) = &feed.feed_info {
            for (row, info) in feed_info.iter_with_row() {
                let trimmed = info.feed_lang.trim();
                if !trimmed.is_empty() && !looks_like_language_code(trimmed) {
                    notices.push(field_notice(
                        CODE_INVALID_LANGUAGE_CODE,
                        NoticeSeverity::Error,
                        FEED_INFO_FILE,
                        "feed_lang",
                        row,
                        trimmed,
                        format!("{trimmed:?} is not a valid BCP 47 language code"),
                    ));
                }
            }
        }
    }
}

/// ISO 4217 currency codes are three uppercase letters; a full membership
/// table churns as currencies are added/retired, so this checks shape, the
/// same tradeoff `InvalidTimezoneValidator` makes for tz names.
fn looks_like_currency_code(value: &str) -> bool {
    value.len() == 3 && value.chars().all(|c| c.is_ascii_uppercase())
}

#[derive(Debug, Default)]
pub struct InvalidCurrencyValidator;

impl Validator for InvalidCurrencyValidator {
    fn name(&self) -> &'static str {
        CODE_INVALID_CURRENCY
    }

    fn category(&self) -> ValidatorCategory {
        ValidatorCategory::Semantic
    }

    fn validate(&self, feed: &GtfsFeed, _indices: &FeedIndices, _ctx: &ValidationContext, notices: &NoticeContainer) {
        let Some(fare_attributes) = &feed.fare_attributes else {
            return;
        };
        for (row, fare) in fare_attributes.iter_with_row() {
            let code = fare.currency_type.trim();
            if !looks_like_currency_code(code) {
                notices.push(field_notice(
                    CODE_INVALID_CURRENCY,
                    NoticeSeverity::Error,
                    "fare_attributes.txt",
                    "currency_type",
                    row,
                    code,
                    format!("{code:?} is not a valid ISO 4217 currency code"),
                ));
            }
            if fare.price < 0.0 || !fare.price.is_finite() {
                notices.push(field_notice(
                    CODE_INVALID_CURRENCY_AMOUNT,
                    NoticeSeverity::Error,
                    "fare_attributes.txt",
                    "price",
                    row,
                    &fare.price.to_string(),
                    format!("price {} is not a valid non-negative amount", fare.price),
                ));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::csv_io::CsvTable;
    use gtfs_model::Agency;

    fn feed_with_agency(agency: Agency) -> GtfsFeed {
        let mut feed = GtfsFeed::default();
        feed.agency = CsvTable {
            headers: vec!["agency_name".into()],
            rows: vec![agency],
            row_numbers: vec![2],
            field_count_mismatches: Vec::new(),
        };
        feed
    }

    #[test]
    fn rejects_malformed_agency_url() {
        let feed = feed_with_agency(Agency {
            agency_url: "not a url".into(),
            ..Default::default()
        });
        let indices = FeedIndices::build(&feed);
        let ctx = ValidationContext::default();
        let notices = NoticeContainer::new();
        InvalidUrlValidator.validate(&feed, &indices, &ctx, &notices);
        assert!(notices.iter().any(|n| n.code == CODE_INVALID_URL));
    }

    #[test]
    fn accepts_well_formed_agency_url() {
        let feed = feed_with_agency(Agency {
            agency_url: "https://example.com".into(),
            ..Default::default()
        });
        let indices = FeedIndices::build(&feed);
        let ctx = ValidationContext::default();
        let notices = NoticeContainer::new();
        InvalidUrlValidator.validate(&feed, &indices, &ctx, &notices);
        assert!(notices.is_empty());
    }

    #[test]
    fn phone_number_check_is_a_no_op_without_country_code() {
        let feed = feed_with_agency(Agency {
            agency_phone: Some("not a phone number at all".into()),
            ..Default::default()
        });
        let indices = FeedIndices::build(&feed);
        let ctx = ValidationContext::default();
        let notices = NoticeContainer::new();
        InvalidPhoneNumberValidator.validate(&feed, &indices, &ctx, &notices);
        assert!(notices.is_empty());
    }

    #[test]
    fn rejects_non_iana_timezone() {
        let feed = feed_with_agency(Agency {
            agency_timezone: "Not A Timezone".into(),
            ..Default::default()
        });
        let indices = FeedIndices::build(&feed);
        let ctx = ValidationContext::default();
        let notices = NoticeContainer::new();
        InvalidTimezoneValidator.validate(&feed, &indices, &ctx, &notices);
        assert!(notices.iter().any(|n| n.code == CODE_INVALID_TIMEZONE));
    }
}
