// src/extractors/records.rs

/// Column layout of one output table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Schema {
    pub name: &'static str,
    pub columns: &'static [&'static str],
}

impl Schema {
    pub fn width(&self) -> usize {
        self.columns.len()
    }
}

pub const DEFINITIVE_SCHEMA: Schema = Schema {
    name: "definitive",
    columns: &[
        "DNI",
        "Apellidos y nombre",
        "Punt.Dir -Parte1",
        "Aciertos-Parte1",
        "Errores-Parte1",
        "Punt.Dir -Parte2",
        "Aciertos-Parte2",
        "Errores-Parte2",
        "TPS",
        "Orden",
    ],
};

pub const DESTINATION_SCHEMA: Schema = Schema {
    name: "destinations",
    columns: &[
        "MINISTERIO",
        "CDIR",
        "CDES",
        "PROVINCIA",
        "LOCALIDAD",
        "PUESTO",
        "CPUESTO",
        "ESPECIFICO",
    ],
};

pub const SCORE_SCHEMA: Schema = Schema {
    name: "scores",
    columns: &["Apellido1", "Apellido2", "Nombre", "DNI", "Puntuacion"],
};

/// Wraps the visible digits of a masked national ID the way the source prints it.
pub fn masked_id(digits: &str) -> String {
    format!("***{}**", digits)
}

/// One line of a definitive results list. Numeric fields keep their source text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DefinitiveRow {
    pub id_digits: String,
    pub name: String,
    pub part1_score: String,
    pub part1_hits: String,
    pub part1_errors: String,
    pub part2_score: String,
    pub part2_hits: String,
    pub part2_errors: String,
    pub total_score: String,
    pub rank: String,
}

/// One row of a destination (vacancy) listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DestinationRow {
    pub issuing_body: String,
    pub directive_center: String,
    pub destination_center: String,
    pub province: String,
    pub locality: String,
    pub position: String,
    pub position_code: String,
    pub supplement: String,
}

/// One line of a ranking-score list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScoreRow {
    pub surname1: String,
    pub surname2: String,
    pub given_name: String,
    pub id_digits: String,
    pub score: String,
}

impl ScoreRow {
    /// Numeric value of the comma-decimal score; unparseable scores sort last.
    pub fn score_value(&self) -> f64 {
        self.score
            .replace(',', ".")
            .parse::<f64>()
            .unwrap_or(f64::NEG_INFINITY)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputRecord {
    Definitive(DefinitiveRow),
    Destination(DestinationRow),
    Score(ScoreRow),
}

impl OutputRecord {
    pub fn schema(&self) -> Schema {
        match self {
            OutputRecord::Definitive(_) => DEFINITIVE_SCHEMA,
            OutputRecord::Destination(_) => DESTINATION_SCHEMA,
            OutputRecord::Score(_) => SCORE_SCHEMA,
        }
    }

    /// Field values in column order. Always exactly `schema().width()` entries.
    pub fn fields(&self) -> Vec<String> {
        match self {
            OutputRecord::Definitive(r) => vec![
                masked_id(&r.id_digits),
                r.name.clone(),
                r.part1_score.clone(),
                r.part1_hits.clone(),
                r.part1_errors.clone(),
                r.part2_score.clone(),
                r.part2_hits.clone(),
                r.part2_errors.clone(),
                r.total_score.clone(),
                r.rank.clone(),
            ],
            OutputRecord::Destination(r) => vec![
                r.issuing_body.clone(),
                r.directive_center.clone(),
                r.destination_center.clone(),
                r.province.clone(),
                r.locality.clone(),
                r.position.clone(),
                r.position_code.clone(),
                r.supplement.clone(),
            ],
            OutputRecord::Score(r) => vec![
                r.surname1.clone(),
                r.surname2.clone(),
                r.given_name.clone(),
                masked_id(&r.id_digits),
                r.score.clone(),
            ],
        }
    }
}
