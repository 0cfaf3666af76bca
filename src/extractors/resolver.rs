// src/extractors/resolver.rs

//! Maps the raw material of one record onto its output schema.
//!
//! Line grammars (definitive results, ranking scores) are a direct capture
//! mapping. Destination rows are resolved positionally from the fragment
//! list with a fixed chain of named rules:
//!
//! 1. [`position_rule`]: the last fragment is the position title.
//! 2. [`comma_locality_rule`]: scanning backwards from the fragment before the
//!    position, the first comma-bearing fragment is the locality and the one
//!    before it the province; if there is none, [`second_to_last_fallback`]
//!    uses the second-to-last fragment for both.
//! 3. [`center_codes_rule`]: the first fragment is the directive center, the
//!    fragments between it and the last two the destination center.
//!
//! A row that reached the assembler as one whole line (directive center,
//! province, position and level on a single unit) is too short for that
//! chain. [`resolve_record_line`] reads it instead: [`province_anchor_rule`]
//! splits the line around a known province, and [`dash_center_rule`] splits
//! the text before the code into destination center and locality.

use crate::extractors::grammar::{DEFINITIVE_LINE_RE, LEVEL_TAG_RE, SCORE_LINE_RE, SHORT_DIGITS_RE};
use crate::extractors::records::{DefinitiveRow, ScoreRow};

// --- Constants ---
// Positional resolution needs a position and something before it.
pub const MIN_RESOLVABLE: usize = 2;
// Destination centers only exist when this many fragments remain.
const MIN_WITH_DESTINATION_CENTER: usize = 5;
const MAX_PROVINCE_WORDS: usize = 4;

/// Province names as printed in the listings.
pub const PROVINCES: &[&str] = &[
    "A CORUÑA", "ALBACETE", "ALICANTE", "ALMERIA", "ASTURIAS", "AVILA",
    "BADAJOZ", "BALEARES", "BARCELONA", "BURGOS", "CACERES", "CADIZ", "CANTABRIA",
    "CASTELLON", "CEUTA", "CIUDAD REAL", "CORDOBA", "CUENCA", "GIRONA", "GRANADA",
    "GUADALAJARA", "GIPUZCOA", "HUELVA", "HUESCA", "JAEN", "LA RIOJA",
    "LAS PALMAS", "LEON", "LLEIDA", "LUGO", "MADRID", "MALAGA", "MELILLA", "MURCIA",
    "NAVARRA", "OURENSE", "PALENCIA", "PONTEVEDRA", "SALAMANCA", "SANTA CRUZ DE TENERIFE",
    "SEGOVIA", "SEVILLA", "SORIA", "TARRAGONA", "TERUEL", "TOLEDO", "VALENCIA", "VALLADOLID",
    "VIZCAYA", "ZAMORA", "ZARAGOZA",
];

/// Destination fields derived from fragments. Code and supplement come from
/// the assembler's trigger detection, not from here.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedFields {
    pub directive_center: String,
    pub destination_center: String,
    pub province: String,
    pub locality: String,
    pub position: String,
}

pub fn is_known_province(text: &str) -> bool {
    PROVINCES.contains(&text)
}

/// Rejoins consecutive fragments that together spell a multi-word province,
/// as happens when record lines are split into words.
pub fn join_known_provinces(fragments: &[String]) -> Vec<String> {
    let mut joined = Vec::with_capacity(fragments.len());
    let mut i = 0;
    while i < fragments.len() {
        let longest = (2..=MAX_PROVINCE_WORDS)
            .rev()
            .filter(|n| i + n <= fragments.len())
            .find(|&n| is_known_province(&fragments[i..i + n].join(" ")));
        match longest {
            Some(n) => {
                joined.push(fragments[i..i + n].join(" "));
                i += n;
            }
            None => {
                joined.push(fragments[i].clone());
                i += 1;
            }
        }
    }
    joined
}

pub fn position_rule(fragments: &[String]) -> String {
    fragments.last().cloned().unwrap_or_default()
}

/// Returns `(province, locality)` when a comma-bearing fragment precedes the
/// position. A comma fragment in first place doubles as its own province.
pub fn comma_locality_rule(fragments: &[String]) -> Option<(String, String)> {
    let body = &fragments[..fragments.len().saturating_sub(1)];
    let idx = body.iter().rposition(|fragment| fragment.contains(','))?;
    let locality = body[idx].clone();
    let province = if idx > 0 {
        body[idx - 1].clone()
    } else {
        locality.clone()
    };
    Some((province, locality))
}

/// Province and locality both collapse onto the second-to-last fragment.
pub fn second_to_last_fallback(fragments: &[String]) -> (String, String) {
    let text = fragments
        .len()
        .checked_sub(2)
        .map(|idx| fragments[idx].clone())
        .unwrap_or_default();
    (text.clone(), text)
}

/// Returns `(directive_center, destination_center)`.
pub fn center_codes_rule(fragments: &[String]) -> (String, String) {
    let directive = fragments.first().cloned().unwrap_or_default();
    let destination = if fragments.len() >= MIN_WITH_DESTINATION_CENTER {
        fragments[1..fragments.len() - 2].join(" ")
    } else {
        String::new()
    };
    (directive, destination)
}

/// Splits a whole record line into `(directive_center, province, position)`
/// around the rightmost known province that still has text after it. A
/// trailing level column is dropped first.
pub fn province_anchor_rule(line: &str) -> Option<(String, String, String)> {
    let mut words: Vec<&str> = line.split_whitespace().collect();
    if words
        .last()
        .is_some_and(|last| LEVEL_TAG_RE.is_match(last) || SHORT_DIGITS_RE.is_match(last))
    {
        words.pop();
    }

    for start in (0..words.len()).rev() {
        for n in (1..=MAX_PROVINCE_WORDS).rev() {
            let end = start + n;
            if end >= words.len() {
                continue;
            }
            let candidate = words[start..end].join(" ");
            if is_known_province(&candidate) {
                return Some((words[..start].join(" "), candidate, words[end..].join(" ")));
            }
        }
    }
    None
}

/// Returns `(destination_center, locality)` from the text preceding the code.
/// The center runs up to the word after a standalone dash and the locality is
/// the rest; without a dash the whole text is the center.
pub fn dash_center_rule(lead: &str) -> (String, String) {
    let words: Vec<&str> = lead.split_whitespace().collect();
    match words.iter().position(|word| *word == "-") {
        Some(dash) => {
            let split = (dash + 2).min(words.len());
            let locality = words[split..].join(" ");
            (
                words[..split].join(" "),
                locality.trim_matches(',').trim().to_string(),
            )
        }
        None => (words.join(" "), String::new()),
    }
}

/// Resolves a row printed as one whole line, plus the text that preceded its
/// code, if any. Returns the fields and the fragments to cache for sibling
/// rows.
pub fn resolve_record_line(line: &str, lead: Option<&str>) -> Option<(ResolvedFields, Vec<String>)> {
    let (directive_center, province, position) = province_anchor_rule(line)?;
    let (destination_center, locality) = lead.map(dash_center_rule).unwrap_or_default();

    let used = [&directive_center, &destination_center, &province, &locality, &position]
        .into_iter()
        .filter(|field| !field.is_empty())
        .cloned()
        .collect();
    Some((
        ResolvedFields {
            directive_center,
            destination_center,
            province,
            locality,
            position,
        },
        used,
    ))
}

/// Resolves a destination row from its cleaned fragments. Returns the fields
/// and the fragment list they were resolved from, or `None` when fewer than
/// `min_fragments` remain.
pub fn resolve_destination(
    fragments: &[String],
    min_fragments: usize,
) -> Option<(ResolvedFields, Vec<String>)> {
    let fragments = join_known_provinces(fragments);
    if fragments.len() < min_fragments.max(MIN_RESOLVABLE) {
        tracing::debug!(
            "Cannot resolve row from {} fragments (need {}): {:?}",
            fragments.len(),
            min_fragments,
            fragments
        );
        return None;
    }

    let position = position_rule(&fragments);
    let (province, locality) = comma_locality_rule(&fragments).unwrap_or_else(|| {
        tracing::trace!("No comma-bearing locality in {:?}, using second-to-last fragment", fragments);
        second_to_last_fallback(&fragments)
    });
    let (directive_center, destination_center) = center_codes_rule(&fragments);

    Some((
        ResolvedFields {
            directive_center,
            destination_center,
            province,
            locality,
            position,
        },
        fragments,
    ))
}

/// Rewrites `3.656,24` as `3656.24`.
pub fn normalize_decimal(amount: &str) -> String {
    amount.replace('.', "").replace(',', ".")
}

pub fn resolve_definitive(line: &str) -> Option<DefinitiveRow> {
    let caps = DEFINITIVE_LINE_RE.captures(line)?;
    Some(DefinitiveRow {
        id_digits: caps["dni"].to_string(),
        name: caps["name"].trim().to_string(),
        part1_score: caps["p1"].to_string(),
        part1_hits: caps["a1"].to_string(),
        part1_errors: caps["e1"].to_string(),
        part2_score: caps["p2"].to_string(),
        part2_hits: caps["a2"].to_string(),
        part2_errors: caps["e2"].to_string(),
        total_score: caps["tps"].to_string(),
        rank: caps["orden"].to_string(),
    })
}

pub fn resolve_score(line: &str) -> Option<ScoreRow> {
    let caps = SCORE_LINE_RE.captures(line)?;
    Some(ScoreRow {
        surname1: caps["surname1"].to_string(),
        surname2: caps["surname2"].trim().to_string(),
        given_name: caps["given"].trim().to_string(),
        id_digits: caps["dni"].to_string(),
        score: caps["score"].to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extractors::records::OutputRecord;

    fn frags(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn position_is_last_fragment() {
        assert_eq!(position_rule(&frags(&["A", "B", "AUXILIAR"])), "AUXILIAR");
        assert_eq!(position_rule(&[]), "");
    }

    #[test]
    fn comma_fragment_is_locality_and_its_predecessor_province() {
        let fragments = frags(&["CDIR", "CDES", "LAS PALMAS", "PALMAS DE GRAN CANARIA, LAS", "AUXILIAR"]);
        assert_eq!(
            comma_locality_rule(&fragments),
            Some(("LAS PALMAS".to_string(), "PALMAS DE GRAN CANARIA, LAS".to_string()))
        );

        // The comma scan ignores the position itself.
        assert_eq!(comma_locality_rule(&frags(&["A", "B", "C", "JEFE, AREA"])), None);

        // A comma fragment in first place is its own province.
        let leading = frags(&["ROZAS, LAS", "B", "C", "D"]);
        assert_eq!(
            comma_locality_rule(&leading),
            Some(("ROZAS, LAS".to_string(), "ROZAS, LAS".to_string()))
        );
    }

    #[test]
    fn without_comma_province_and_locality_collapse() {
        let fragments = frags(&["CENTRO", "A", "MADRID", "AUXILIAR"]);
        assert_eq!(comma_locality_rule(&fragments), None);
        assert_eq!(
            second_to_last_fallback(&fragments),
            ("MADRID".to_string(), "MADRID".to_string())
        );
    }

    #[test]
    fn destination_center_needs_five_fragments() {
        assert_eq!(
            center_codes_rule(&frags(&["CDIR", "X", "PROV", "LOC, A", "PUESTO"])),
            ("CDIR".to_string(), "X PROV".to_string())
        );
        assert_eq!(
            center_codes_rule(&frags(&["CDIR", "X", "Y", "PROV", "LOC, A", "PUESTO"])),
            ("CDIR".to_string(), "X Y PROV".to_string())
        );
        assert_eq!(
            center_codes_rule(&frags(&["CDIR", "PROV", "LOC, A", "PUESTO"])),
            ("CDIR".to_string(), String::new())
        );
    }

    #[test]
    fn resolve_requires_minimum_fragments() {
        assert!(resolve_destination(&frags(&["A", "B", "C"]), 4).is_none());

        let (fields, used) = resolve_destination(&frags(&["SUBSECRETARIA", "S.G. PERSONAL", "MADRID", "MADRID, MADRID", "AUXILIAR"]), 4).unwrap();
        assert_eq!(used.len(), 5);
        assert_eq!(
            fields,
            ResolvedFields {
                directive_center: "SUBSECRETARIA".to_string(),
                destination_center: "S.G. PERSONAL MADRID".to_string(),
                province: "MADRID".to_string(),
                locality: "MADRID, MADRID".to_string(),
                position: "AUXILIAR".to_string(),
            }
        );
    }

    #[test]
    fn split_provinces_are_rejoined() {
        let words = frags(&["CENTRO", "SANTA", "CRUZ", "DE", "TENERIFE", "CIUDAD", "REAL", "CIUDAD"]);
        assert_eq!(
            join_known_provinces(&words),
            frags(&["CENTRO", "SANTA CRUZ DE TENERIFE", "CIUDAD REAL", "CIUDAD"])
        );
    }

    #[test]
    fn whole_line_splits_around_province() {
        assert_eq!(
            province_anchor_rule("CENTRO A MADRID AUXILIAR NIVEL18"),
            Some(("CENTRO A".to_string(), "MADRID".to_string(), "AUXILIAR".to_string()))
        );
        // Multi-word cells stay whole and a province inside the directive
        // center does not win over the province column.
        assert_eq!(
            province_anchor_rule("DELEGACION EN MADRID MADRID JEFE DE SECCION 22"),
            Some((
                "DELEGACION EN MADRID".to_string(),
                "MADRID".to_string(),
                "JEFE DE SECCION".to_string()
            ))
        );
        assert_eq!(
            province_anchor_rule("S.G. TRIBUTOS SANTA CRUZ DE TENERIFE GESTOR NIVEL20"),
            Some((
                "S.G. TRIBUTOS".to_string(),
                "SANTA CRUZ DE TENERIFE".to_string(),
                "GESTOR".to_string()
            ))
        );
        // The province must be followed by a position.
        assert_eq!(province_anchor_rule("CENTRO A MADRID NIVEL18"), None);
        assert_eq!(province_anchor_rule("MADRID, MADRID"), None);
    }

    #[test]
    fn dash_separates_center_from_locality() {
        assert_eq!(
            dash_center_rule("DIR. PROV. - TOLEDO TALAVERA DE LA REINA,"),
            ("DIR. PROV. - TOLEDO".to_string(), "TALAVERA DE LA REINA".to_string())
        );
        assert_eq!(dash_center_rule("CENTRO B"), ("CENTRO B".to_string(), String::new()));
        assert_eq!(dash_center_rule("OFICINA -"), ("OFICINA -".to_string(), String::new()));
    }

    #[test]
    fn record_line_resolves_with_lead() {
        let (fields, used) =
            resolve_record_line("SUBDIRECCION GENERAL MADRID JEFE DE SECCION NIVEL22", Some("S.G. X")).unwrap();
        assert_eq!(
            fields,
            ResolvedFields {
                directive_center: "SUBDIRECCION GENERAL".to_string(),
                destination_center: "S.G. X".to_string(),
                province: "MADRID".to_string(),
                locality: String::new(),
                position: "JEFE DE SECCION".to_string(),
            }
        );
        assert_eq!(used, frags(&["SUBDIRECCION GENERAL", "S.G. X", "MADRID", "JEFE DE SECCION"]));
        assert!(resolve_record_line("OPERADOR", None).is_none());
    }

    #[test]
    fn decimal_normalization() {
        assert_eq!(normalize_decimal("3.656,24"), "3656.24");
        assert_eq!(normalize_decimal("589,76"), "589.76");
    }

    #[test]
    fn definitive_line_maps_one_to_one() {
        let row = resolve_definitive("***12345678** GARCIA LOPEZ, JUAN. 7,50 35 5 8,25 40 0 7,88 12").unwrap();
        assert_eq!(
            OutputRecord::Definitive(row).fields(),
            frags(&["***12345678**", "GARCIA LOPEZ, JUAN", "7,50", "35", "5", "8,25", "40", "0", "7,88", "12"])
        );
        assert!(resolve_definitive("***12345678** GARCIA LOPEZ, JUAN 7,50 35 5 8,25 40 0 7,88 12").is_none());
        assert!(resolve_definitive("***12345678** GARCIA. 7,505 35 5 8,25 40 0 7,88 12").is_none());
    }

    #[test]
    fn score_line_splits_names() {
        let row = resolve_score("DE LA FUENTE, MARIA JOSE ***7654321** 9,20").unwrap();
        assert_eq!(row.surname1, "DE");
        assert_eq!(row.surname2, "LA FUENTE");
        assert_eq!(row.given_name, "MARIA JOSE");
        assert_eq!(
            OutputRecord::Score(row).fields(),
            frags(&["DE", "LA FUENTE", "MARIA JOSE", "***7654321**", "9,20"])
        );
        assert!(resolve_score("GARCIA LOPEZ, JUAN ***12345678** 9,2").is_none());
    }
}
