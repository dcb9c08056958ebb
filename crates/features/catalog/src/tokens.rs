//! Parsing of `"<locality>-<zone type>"` availability tokens, as submitted by the plan
//! editor. Both parts are names, matched ignoring case.

use fxhash::FxHashSet;
use nexo_domain::{AvailabilityPair, Locality, ZoneType};
use serde::Serialize;
use std::fmt;

/// Why a token was left out of [`ParsedAvailability::pairs`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "name", rename_all = "snake_case")]
pub enum DropReason {
    /// The token is not exactly two `-` separated parts.
    Malformed,
    UnknownLocality(String),
    UnknownZoneType(String),
}

impl fmt::Display for DropReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Malformed => f.write_str("expected '<locality>-<zone type>'"),
            Self::UnknownLocality(name) => write!(f, "unknown locality '{name}'"),
            Self::UnknownZoneType(name) => write!(f, "unknown zone type '{name}'"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DroppedToken {
    pub token: String,
    pub reason: DropReason,
}

/// Result of [`parse_availability_tokens`]: the usable pairs, in token order without
/// duplicates, and every token that was skipped.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ParsedAvailability {
    pub pairs: Vec<AvailabilityPair>,
    pub dropped: Vec<DroppedToken>,
}

/// Splits each token on `-` and keeps the pairs whose parts name a known locality and zone
/// type. Names are trimmed and compared ignoring case.
pub fn parse_availability_tokens<I, T>(
    tokens: I,
    localities: &[Locality],
    zone_types: &[ZoneType],
) -> ParsedAvailability
where
    I: IntoIterator<Item = T>,
    T: AsRef<str>,
{
    let mut parsed = ParsedAvailability::default();
    let mut seen = FxHashSet::default();

    for token in tokens {
        let token = token.as_ref();
        let dropped = |reason| DroppedToken { token: token.to_owned(), reason };

        let parts: Vec<String> = token.split('-').map(|part| part.trim().to_lowercase()).collect();
        let [locality, zone_type] = parts.as_slice() else {
            parsed.dropped.push(dropped(DropReason::Malformed));
            continue;
        };
        if locality.is_empty() || zone_type.is_empty() {
            parsed.dropped.push(dropped(DropReason::Malformed));
            continue;
        }

        let Some(locality) = localities.iter().find(|l| l.name.trim().to_lowercase() == *locality)
        else {
            parsed.dropped.push(dropped(DropReason::UnknownLocality(locality.clone())));
            continue;
        };
        let Some(zone_type) =
            zone_types.iter().find(|z| z.name.trim().to_lowercase() == *zone_type)
        else {
            parsed.dropped.push(dropped(DropReason::UnknownZoneType(zone_type.clone())));
            continue;
        };

        let pair = AvailabilityPair::new(locality.id.clone(), zone_type.id.clone());
        if seen.insert(pair.clone()) {
            parsed.pairs.push(pair);
        }
    }

    parsed
}
