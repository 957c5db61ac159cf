//! `Accept` and `Accept-Language` preference ranking (RFC 2616 §14.1, §14.4).
//!
//! Parsing is lenient: segments that do not look like a media range or a
//! language tag are skipped, and a quality value outside `[0, 1]` is clamped.
//! Nothing in this module returns an error.

use std::cell::OnceCell;
use std::cmp::Ordering;
use std::collections::BTreeMap;

use http::header;

use crate::request::RequestContext;

/// One media range from an `Accept` header.
#[derive(Debug, Clone, PartialEq)]
pub struct AcceptEntry {
    /// Top-level type, e.g. `text` or `*`
    pub main_type: String,
    /// Subtype without the structured-syntax suffix, e.g. `xhtml` or `*`
    pub subtype: String,
    /// Structured-syntax suffix, e.g. `xml` for `application/xhtml+xml`
    pub base_type: Option<String>,
    /// Parameters other than `q`, keys lower-cased
    pub params: BTreeMap<String, String>,
    /// Quality value in `[0, 1]`
    pub q: f32,
}

impl AcceptEntry {
    /// Whether the type is `*`.
    pub fn is_wildcard_type(&self) -> bool {
        self.main_type == "*"
    }

    /// Whether the subtype is `*`.
    pub fn is_wildcard_subtype(&self) -> bool {
        self.subtype == "*"
    }

    /// Subtype including the suffix, e.g. `xhtml+xml`.
    pub fn full_subtype(&self) -> String {
        match self.base_type {
            Some(ref base) => format!("{}+{}", self.subtype, base),
            None => self.subtype.clone(),
        }
    }

    /// `type/subtype[+base]` without parameters.
    pub fn essence(&self) -> String {
        format!("{}/{}", self.main_type, self.full_subtype())
    }

    /// Whether this range covers the concrete media type `mime`.
    ///
    /// Parameters on `mime` are ignored.
    pub fn matches(&self, mime: &str) -> bool {
        let essence = mime.split(';').next().unwrap_or_default().trim();
        let Some((main_type, subtype)) = essence.split_once('/') else {
            return false;
        };

        (self.is_wildcard_type() || self.main_type.eq_ignore_ascii_case(main_type))
            && (self.is_wildcard_subtype() || self.full_subtype().eq_ignore_ascii_case(subtype))
    }
}

/// One language range from an `Accept-Language` header.
#[derive(Debug, Clone, PartialEq)]
pub struct LanguagePreference {
    /// Language tag as sent by the client, e.g. `en-US`
    pub tag: String,
    /// Quality value in `[0, 1]`
    pub q: f32,
}

/// Parses an `Accept` header into its media ranges, in header order.
///
/// # Examples
///
/// ```
/// use request_guard::parse_accept_header;
///
/// let entries = parse_accept_header("application/xhtml+xml;q=0.9;level=1, garbage, */*;q=1.5");
/// assert_eq!(entries.len(), 2);
/// assert_eq!(entries[0].subtype, "xhtml");
/// assert_eq!(entries[0].base_type.as_deref(), Some("xml"));
/// assert_eq!(entries[0].params.get("level").map(String::as_str), Some("1"));
/// assert_eq!(entries[1].q, 1.0);
/// ```
pub fn parse_accept_header(header: &str) -> Vec<AcceptEntry> {
    header.split(',').filter_map(parse_media_range).collect()
}

fn parse_media_range(segment: &str) -> Option<AcceptEntry> {
    let mut parts = segment.split(';');
    let (main_type, subtype) = parts.next()?.trim().split_once('/')?;
    let (main_type, subtype) = (main_type.trim(), subtype.trim());
    if !is_media_token(main_type) || !is_media_token(subtype) {
        return None;
    }

    let (subtype, base_type) = match subtype.rsplit_once('+') {
        Some((subtype, base)) if !subtype.is_empty() && !base.is_empty() => {
            (subtype, Some(base.to_string()))
        }
        _ => (subtype, None),
    };

    let mut params = BTreeMap::new();
    let mut q = 1.0;
    for param in parts {
        let Some((key, value)) = param.split_once('=') else {
            continue;
        };
        let key = key.trim().to_ascii_lowercase();
        let value = value.trim().trim_matches('"');
        if key.is_empty() || value.is_empty() {
            continue;
        }

        if key == "q" {
            q = parse_quality(value);
        } else {
            params.insert(key, value.to_string());
        }
    }

    Some(AcceptEntry {
        main_type: main_type.to_string(),
        subtype: subtype.to_string(),
        base_type,
        params,
        q,
    })
}

fn is_media_token(token: &str) -> bool {
    !token.is_empty()
        && token
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '.' | '+' | '*' | '_'))
}

/// Parses a quality value. Unparseable input counts as `0`, the result is clamped to `[0, 1]`.
fn parse_quality(value: &str) -> f32 {
    match value.parse::<f32>() {
        Ok(q) if q.is_nan() => 0.0,
        // Also folds -0.0 into 0.0 so equal qualities compare equal
        Ok(q) if q <= 0.0 => 0.0,
        Ok(q) => q.min(1.0),
        Err(_) => 0.0,
    }
}

/// Preference order between two media ranges.
///
/// Higher quality first; on a tie, a concrete type beats `*`, then a concrete
/// subtype beats `*`, then more parameters beat fewer. This is a total order
/// on those keys, so any sort algorithm yields the same ranking.
pub fn compare_accept_entries(a: &AcceptEntry, b: &AcceptEntry) -> Ordering {
    b.q.total_cmp(&a.q)
        .then_with(|| a.is_wildcard_type().cmp(&b.is_wildcard_type()))
        .then_with(|| a.is_wildcard_subtype().cmp(&b.is_wildcard_subtype()))
        .then_with(|| b.params.len().cmp(&a.params.len()))
}

/// Sorts media ranges from most to least preferred.
///
/// # Examples
///
/// ```
/// use request_guard::{parse_accept_header, rank_accept_types};
///
/// let ranked = rank_accept_types(parse_accept_header(
///     "application/xhtml+xml;q=0.9;level=1,application/xml;q=0.9,*/*;q=0.8",
/// ));
/// let order: Vec<_> = ranked.iter().map(|entry| entry.essence()).collect();
/// assert_eq!(order, ["application/xhtml+xml", "application/xml", "*/*"]);
/// ```
pub fn rank_accept_types(mut entries: Vec<AcceptEntry>) -> Vec<AcceptEntry> {
    entries.sort_by(compare_accept_entries);
    entries
}

/// Parses an `Accept-Language` header, in header order.
pub fn parse_accept_languages(header: &str) -> Vec<LanguagePreference> {
    header
        .split(',')
        .filter_map(|segment| {
            let mut parts = segment.split(';');
            let tag = parts.next()?.trim();
            if !is_language_tag(tag) {
                return None;
            }

            let q = parts
                .filter_map(|param| param.split_once('='))
                .find(|(key, _)| key.trim().eq_ignore_ascii_case("q"))
                .map_or(1.0, |(_, value)| parse_quality(value.trim()));

            Some(LanguagePreference {
                tag: tag.to_string(),
                q,
            })
        })
        .collect()
}

fn is_language_tag(tag: &str) -> bool {
    tag == "*"
        || (!tag.is_empty()
            && tag
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'))
}

fn rank_language_preferences(mut preferences: Vec<LanguagePreference>) -> Vec<LanguagePreference> {
    // Stable: equal qualities keep header order
    preferences.sort_by(|a, b| b.q.total_cmp(&a.q));
    preferences
}

/// Returns the language tags of an `Accept-Language` header, most preferred first.
///
/// Only quality matters; ties keep header order.
///
/// # Examples
///
/// ```
/// use request_guard::rank_accept_languages;
///
/// assert_eq!(rank_accept_languages("fr;q=0.8,en;q=0.9,de"), ["de", "en", "fr"]);
/// ```
pub fn rank_accept_languages(header: &str) -> Vec<String> {
    rank_language_preferences(parse_accept_languages(header))
        .into_iter()
        .map(|preference| preference.tag)
        .collect()
}

/// Normalises a language tag: lower case, `_` as separator (`en-US` → `en_us`).
pub fn canonical_language_id(tag: &str) -> String {
    tag.trim().to_ascii_lowercase().replace('-', "_")
}

/// Request-scoped content negotiation.
///
/// Header parsing and ranking run at most once per negotiator; later calls
/// reuse the cached result.
///
/// # Examples
///
/// ```
/// use request_guard::AcceptNegotiator;
/// use request_guard::web::{ExtractContext, RequestAdapter};
///
/// let mut adapter = RequestAdapter::new("req-1".to_string());
/// adapter.add_header("Accept", "text/html,application/json;q=0.5");
/// adapter.add_header("Accept-Language", "de-CH, en;q=0.7");
/// let request = adapter.extract_context();
///
/// let negotiator = AcceptNegotiator::new(&request);
/// assert_eq!(negotiator.preferred_type().map(|t| t.essence()).as_deref(), Some("text/html"));
/// assert_eq!(negotiator.preferred_language(), Some("de-CH"));
/// assert_eq!(negotiator.preferred_language_from(&["en", "de"]), Some("de"));
///
/// let bare = RequestAdapter::new("req-2".to_string()).extract_context();
/// assert!(AcceptNegotiator::new(&bare).preferred_type().is_none());
/// ```
#[derive(Debug)]
pub struct AcceptNegotiator<'r> {
    request: &'r RequestContext,
    types: OnceCell<Vec<AcceptEntry>>,
    languages: OnceCell<Vec<LanguagePreference>>,
}

impl<'r> AcceptNegotiator<'r> {
    /// Creates a negotiator. Headers are parsed on first use.
    pub fn new(request: &'r RequestContext) -> Self {
        Self {
            request,
            types: OnceCell::new(),
            languages: OnceCell::new(),
        }
    }

    /// Ranked media ranges of the `Accept` header. Empty when the header is absent.
    pub fn accept_types(&self) -> &[AcceptEntry] {
        self.types.get_or_init(|| {
            self.request
                .header(header::ACCEPT.as_str())
                .map(|value| rank_accept_types(parse_accept_header(value)))
                .unwrap_or_default()
        })
    }

    /// Ranked records of the `Accept-Language` header. Empty when the header is absent.
    pub fn language_preferences(&self) -> &[LanguagePreference] {
        self.languages.get_or_init(|| {
            self.request
                .header(header::ACCEPT_LANGUAGE.as_str())
                .map(|value| rank_language_preferences(parse_accept_languages(value)))
                .unwrap_or_default()
        })
    }

    /// Ranked language tags of the `Accept-Language` header.
    pub fn accept_languages(&self) -> Vec<&str> {
        self.language_preferences()
            .iter()
            .map(|preference| preference.tag.as_str())
            .collect()
    }

    /// The most preferred media range, `None` when the client stated no preference.
    pub fn preferred_type(&self) -> Option<&AcceptEntry> {
        self.accept_types().first()
    }

    /// The most preferred language tag, `None` when the client stated no preference.
    pub fn preferred_language(&self) -> Option<&str> {
        self.language_preferences()
            .first()
            .map(|preference| preference.tag.as_str())
    }

    /// Picks the best of the languages the application supports.
    ///
    /// Tags are compared in canonical form. A regional preference also
    /// matches its primary language (`de-CH` matches `de`), and `*` matches
    /// the first supported language. Ranges with `q=0` are never chosen.
    pub fn preferred_language_from<'s>(&self, supported: &[&'s str]) -> Option<&'s str> {
        let supported_ids: Vec<String> = supported
            .iter()
            .map(|tag| canonical_language_id(tag))
            .collect();

        for preference in self.language_preferences() {
            if preference.q <= 0.0 {
                continue;
            }
            if preference.tag == "*" {
                return supported.first().copied();
            }

            let wanted = canonical_language_id(&preference.tag);
            let primary = wanted.split('_').next().unwrap_or_default();

            let found = supported_ids
                .iter()
                .position(|id| *id == wanted)
                .or_else(|| supported_ids.iter().position(|id| id == primary));
            if let Some(index) = found {
                return Some(supported[index]);
            }
        }

        None
    }

    /// Whether the client accepts `mime` with a non-zero quality.
    ///
    /// A request without an `Accept` header accepts everything.
    pub fn accepts(&self, mime: &str) -> bool {
        let types = self.accept_types();
        types.is_empty() || types.iter().any(|entry| entry.q > 0.0 && entry.matches(mime))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::web::{ExtractContext, RequestAdapter};

    fn request_with(headers: &[(&str, &str)]) -> RequestContext {
        let mut adapter = RequestAdapter::new("req-negotiate".to_string());
        for (name, value) in headers {
            adapter.add_header(name, value);
        }
        adapter.extract_context()
    }

    fn essences(entries: &[AcceptEntry]) -> Vec<String> {
        entries.iter().map(AcceptEntry::essence).collect()
    }

    #[test]
    fn missing_q_defaults_to_one() {
        let entries = parse_accept_header("text/html");
        assert_eq!(entries[0].q, 1.0);
        assert!(entries[0].params.is_empty());
    }

    #[test]
    fn q_is_clamped() {
        let entries = parse_accept_header("text/a;q=1.5, text/b;q=-0.2, text/c;q=-0");
        let qualities: Vec<f32> = entries.iter().map(|entry| entry.q).collect();
        assert_eq!(qualities, vec![1.0, 0.0, 0.0]);
        assert!(entries[2].q.is_sign_positive());
    }

    #[test]
    fn unparseable_q_is_zero() {
        assert_eq!(parse_accept_header("text/html;q=high")[0].q, 0.0);
        assert_eq!(parse_accept_header("text/html;q=NaN")[0].q, 0.0);
    }

    #[test]
    fn malformed_segments_are_skipped() {
        let entries = parse_accept_header(",text,/html, text/, te xt/html,text/h<>tml,image/png ;");
        assert_eq!(essences(&entries), vec!["image/png"]);
    }

    #[test]
    fn malformed_params_are_ignored() {
        let entries = parse_accept_header("text/html; level; =1; charset=\"utf-8\"; Q=0.4");
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].q, 0.4);
        assert_eq!(entries[0].params.len(), 1);
        assert_eq!(
            entries[0].params.get("charset").map(String::as_str),
            Some("utf-8")
        );
    }

    #[test]
    fn suffix_is_split_from_last_plus() {
        let entry = &parse_accept_header("application/vnd.api+v2+json")[0];
        assert_eq!(entry.subtype, "vnd.api+v2");
        assert_eq!(entry.base_type.as_deref(), Some("json"));
        assert_eq!(entry.essence(), "application/vnd.api+v2+json");
    }

    #[test]
    fn ranking_example_from_browser_header() {
        let ranked = rank_accept_types(parse_accept_header(
            "application/xhtml+xml;q=0.9;level=1,application/xml;q=0.9,*/*;q=0.8",
        ));
        assert_eq!(
            essences(&ranked),
            vec!["application/xhtml+xml", "application/xml", "*/*"]
        );
    }

    #[test]
    fn wildcards_break_quality_ties() {
        let ranked = rank_accept_types(parse_accept_header("*/*, text/*, text/html"));
        assert_eq!(essences(&ranked), vec!["text/html", "text/*", "*/*"]);
    }

    #[test]
    fn type_wildcard_ranks_below_subtype_wildcard() {
        let ranked = rank_accept_types(parse_accept_header("*/html, text/*"));
        assert_eq!(essences(&ranked), vec!["text/*", "*/html"]);
    }

    #[test]
    fn quality_dominates_specificity() {
        let ranked = rank_accept_types(parse_accept_header("text/html;q=0.1, */*"));
        assert_eq!(essences(&ranked), vec!["*/*", "text/html"]);
    }

    #[test]
    fn full_ties_keep_header_order() {
        let ranked = rank_accept_types(parse_accept_header("image/png, image/webp, image/avif"));
        assert_eq!(
            essences(&ranked),
            vec!["image/png", "image/webp", "image/avif"]
        );
    }

    #[test]
    fn languages_rank_by_quality() {
        assert_eq!(
            rank_accept_languages("fr;q=0.8,en;q=0.9,de"),
            vec!["de", "en", "fr"]
        );
    }

    #[test]
    fn language_ties_keep_header_order() {
        assert_eq!(
            rank_accept_languages("pt-BR, es;q=0.5, pt, it;q=0.5"),
            vec!["pt-BR", "pt", "es", "it"]
        );
    }

    #[test]
    fn language_q_is_clamped_and_garbage_skipped() {
        let parsed = parse_accept_languages("a;q=1.5, b;q=-0.2, c d, , *;q=0.1");
        let records: Vec<(&str, f32)> = parsed
            .iter()
            .map(|preference| (preference.tag.as_str(), preference.q))
            .collect();
        assert_eq!(records, vec![("a", 1.0), ("b", 0.0), ("*", 0.1)]);
    }

    #[test]
    fn canonical_ids() {
        assert_eq!(canonical_language_id(" en-US "), "en_us");
        assert_eq!(canonical_language_id("zh_Hant_TW"), "zh_hant_tw");
    }

    #[test]
    fn negotiator_without_headers_returns_none() {
        let request = request_with(&[]);
        let negotiator = AcceptNegotiator::new(&request);

        assert!(negotiator.preferred_type().is_none());
        assert!(negotiator.preferred_language().is_none());
        assert!(negotiator.accept_languages().is_empty());
        assert!(negotiator.preferred_language_from(&["en"]).is_none());
        assert!(negotiator.accepts("text/html"));
    }

    #[test]
    fn negotiator_with_empty_headers_returns_none() {
        let request = request_with(&[("Accept", ""), ("Accept-Language", "")]);
        let negotiator = AcceptNegotiator::new(&request);

        assert!(negotiator.preferred_type().is_none());
        assert!(negotiator.preferred_language().is_none());
    }

    #[test]
    fn negotiator_results_are_memoized() {
        let request = request_with(&[("Accept", "text/html, application/json;q=0.2")]);
        let negotiator = AcceptNegotiator::new(&request);

        let first = negotiator.accept_types().as_ptr();
        let second = negotiator.accept_types().as_ptr();
        assert_eq!(first, second);
    }

    #[test]
    fn preferred_language_from_supported_set() {
        let request = request_with(&[("Accept-Language", "fr-CA;q=0.9, en-GB, *;q=0.1")]);
        let negotiator = AcceptNegotiator::new(&request);

        assert_eq!(negotiator.preferred_language(), Some("en-GB"));
        assert_eq!(
            negotiator.preferred_language_from(&["fr", "en_gb"]),
            Some("en_gb")
        );
        assert_eq!(negotiator.preferred_language_from(&["fr", "en"]), Some("en"));
        assert_eq!(negotiator.preferred_language_from(&["ja", "fr"]), Some("fr"));
        assert_eq!(negotiator.preferred_language_from(&["ja"]), Some("ja"));
    }

    #[test]
    fn zero_quality_language_is_never_chosen() {
        let request = request_with(&[("Accept-Language", "de;q=0, en;q=0.5")]);
        let negotiator = AcceptNegotiator::new(&request);

        assert_eq!(negotiator.preferred_language_from(&["de"]), None);
        assert_eq!(negotiator.preferred_language_from(&["de", "en"]), Some("en"));
    }

    #[test]
    fn accepts_matches_wildcards_and_suffixes() {
        let request = request_with(&[(
            "Accept",
            "application/activity+json, text/*;q=0.5, image/png;q=0",
        )]);
        let negotiator = AcceptNegotiator::new(&request);

        assert!(negotiator.accepts("application/activity+json"));
        assert!(negotiator.accepts("text/plain; charset=utf-8"));
        assert!(!negotiator.accepts("image/png"));
        assert!(!negotiator.accepts("application/json"));
        assert!(!negotiator.accepts("not-a-mime"));
    }
}
