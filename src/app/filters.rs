use serde::Deserialize;

use super::records::InstanceState;

/// Raw filter form input, exactly as submitted. Rebuilt into an
/// [`InstanceFilter`] on every submission; never reused across queries.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawFilter {
    /// Comma/whitespace separated instance ids.
    #[serde(default)]
    pub instance_ids: String,
    /// Comma separated tag segments: `Key=v1|v2`, bare `Key`, or `=value`.
    #[serde(default)]
    pub tags: String,
    /// One of the instance state names, or `all`/empty.
    #[serde(default)]
    pub state: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InstanceStateFilter {
    #[default]
    All,
    Only(InstanceState),
}

/// A tag matching rule applied server-side by the remote list operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TagPredicate {
    /// The instance carries the tag key, any value.
    HasKey(String),
    /// Some tag on the instance carries this value, any key.
    HasValue(String),
    /// The tag key carries one of the listed values.
    Matches { key: String, values: Vec<String> },
}

/// Structured query built from [`RawFilter`]. Immutable once constructed.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct InstanceFilter {
    pub instance_ids: Vec<String>,
    pub tag_predicates: Vec<TagPredicate>,
    pub state: InstanceStateFilter,
}

/// Normalization output: the filter plus non-fatal warnings for segments
/// that could not be parsed. Warnings never fail the query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedFilter {
    pub filter: InstanceFilter,
    pub warnings: Vec<String>,
}

/// Wire-level query shape: either an exclusive id list, or attribute
/// filters as (name, values) pairs. Kept SDK-free so the mapping stays
/// testable without a client.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct WireQuery {
    pub instance_ids: Vec<String>,
    pub filters: Vec<(String, Vec<String>)>,
}

pub fn normalize(raw: &RawFilter) -> NormalizedFilter {
    let mut warnings = Vec::new();

    let instance_ids: Vec<String> = raw
        .instance_ids
        .split(|c: char| c == ',' || c.is_whitespace())
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(str::to_string)
        .collect();

    let mut tag_predicates = Vec::new();
    for segment in raw.tags.split(',') {
        let segment = segment.trim();
        if segment.is_empty() {
            continue;
        }
        match parse_tag_segment(segment) {
            Some(predicate) => tag_predicates.push(predicate),
            None => warnings.push(format!(
                "ignoring tag filter segment {:?}: expected key=value",
                segment
            )),
        }
    }

    let state = match raw.state.trim() {
        "" => InstanceStateFilter::All,
        s if s.eq_ignore_ascii_case("all") => InstanceStateFilter::All,
        s => match InstanceState::parse(s) {
            Some(state) => InstanceStateFilter::Only(state),
            None => {
                warnings.push(format!("ignoring unrecognized state filter {:?}", s));
                InstanceStateFilter::All
            }
        },
    };

    NormalizedFilter {
        filter: InstanceFilter {
            instance_ids,
            tag_predicates,
            state,
        },
        warnings,
    }
}

fn parse_tag_segment(segment: &str) -> Option<TagPredicate> {
    let Some((key, value)) = segment.split_once('=') else {
        // Bare key: "has tag key" predicate.
        return Some(TagPredicate::HasKey(segment.to_string()));
    };

    let key = key.trim();
    let mut values: Vec<String> = value
        .split('|')
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .collect();

    if key.is_empty() {
        // "=a|b" has no key to anchor the alternatives on.
        if values.len() == 1 {
            return Some(TagPredicate::HasValue(values.remove(0)));
        }
        return None;
    }

    if values.is_empty() {
        return Some(TagPredicate::HasKey(key.to_string()));
    }

    Some(TagPredicate::Matches {
        key: key.to_string(),
        values,
    })
}

impl InstanceFilter {
    /// Map to the remote query. When any instance ids are present the lookup
    /// is id-exclusive: tag and state predicates are dropped, mirroring the
    /// remote API's filtering semantics.
    pub fn wire_query(&self) -> WireQuery {
        if !self.instance_ids.is_empty() {
            return WireQuery {
                instance_ids: self.instance_ids.clone(),
                filters: Vec::new(),
            };
        }

        let mut filters = Vec::new();
        for predicate in &self.tag_predicates {
            match predicate {
                TagPredicate::Matches { key, values } => {
                    filters.push((format!("tag:{}", key), values.clone()));
                }
                TagPredicate::HasKey(key) => {
                    filters.push(("tag-key".to_string(), vec![key.clone()]));
                }
                TagPredicate::HasValue(value) => {
                    filters.push(("tag-value".to_string(), vec![value.clone()]));
                }
            }
        }

        if let InstanceStateFilter::Only(state) = self.state {
            filters.push((
                "instance-state-name".to_string(),
                vec![state.as_str().to_string()],
            ));
        }

        WireQuery {
            instance_ids: Vec::new(),
            filters,
        }
    }
}
