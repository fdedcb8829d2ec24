//! Default decision extractor: regex field extraction over bulletin text.
//!
//! A bulletin concatenates many decisions; each block runs from the
//! republic header to its `Data:` line. Blocks that cannot yield the
//! identifying dossier number are skipped individually, never aborting
//! the rest of the payload.

use std::sync::LazyLock;

use regex::Regex;

use bercline_core::Extractor;

use crate::decision::Decision;

/// The 42 county jurisdictions decisions are attributed to.
const COUNTIES: [&str; 42] = [
    "Alba",
    "Arad",
    "Argeș",
    "Bacău",
    "Bihor",
    "Bistrița-Năsăud",
    "Botoșani",
    "Brăila",
    "Brașov",
    "București",
    "Buzău",
    "Călărași",
    "Caraș-Severin",
    "Cluj",
    "Constanța",
    "Covasna",
    "Dâmbovița",
    "Dolj",
    "Galați",
    "Giurgiu",
    "Gorj",
    "Harghita",
    "Hunedoara",
    "Ialomița",
    "Iași",
    "Ilfov",
    "Maramureș",
    "Mehedinți",
    "Mureș",
    "Neamț",
    "Olt",
    "Prahova",
    "Sălaj",
    "Satu Mare",
    "Sibiu",
    "Suceava",
    "Teleorman",
    "Timiș",
    "Tulcea",
    "Vâlcea",
    "Vaslui",
    "Vrancea",
];

static DECISION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)R O M Â N I A(.*?)Data:\s*(\d{2}\.\d{2}\.\d{4})").expect("invalid regex")
});
static DOSSIER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"DOSAR NR\.\s*(\S+)").expect("invalid regex"));
static DECISION_NO_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"ÎNCHEIERE nr\.\s*(\d+)").expect("invalid regex"));
static FIRM_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Firma:\s*([^\n]+)").expect("invalid regex"));
static ADDRESS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Sediul:\s*([^\n]+)").expect("invalid regex"));
static COUNTY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"de pe lângă Tribunalul (\S+)").expect("invalid regex"));
static REG_CODE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Cod unic de înregistrare:\s*(\d+)").expect("invalid regex"));
static REG_ORDER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"Număr de ordine în registrul comerțului:\s*([^\n]+)").expect("invalid regex")
});
static EUID_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"Identificator unic la nivel european \(EUID\):\s*([^\n]+)")
        .expect("invalid regex")
});
static REGISTRAR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"Registratorul de registrul comerțului:\s*([^\n]+)").expect("invalid regex")
});
static REQUEST_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?s)formulată de\s+(.*?)\s+(?:în calitate de\s+(.*?)\s+)?privind\s+(.*?)\s*\nExaminând",
    )
    .expect("invalid regex")
});
static DISPOSITION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)D I S P U N E(.*?)Registrator de registrul comerțului")
        .expect("invalid regex")
});

/// Fold Romanian diacritics to their base letters and lowercase.
///
/// Covers both the comma-below and legacy cedilla forms the bulletins mix.
pub(crate) fn fold_diacritics(text: &str) -> String {
    text.chars()
        .map(|c| match c {
            'ă' | 'â' | 'Ă' | 'Â' => 'a',
            'î' | 'Î' => 'i',
            'ș' | 'ş' | 'Ș' | 'Ş' => 's',
            'ț' | 'ţ' | 'Ț' | 'Ţ' => 't',
            other => other.to_ascii_lowercase(),
        })
        .collect()
}

/// Match a tribunal token against the county list.
///
/// The token is a single word, so multi-word counties ("Satu Mare") are
/// resolved by unique folded-prefix match; no fuzzy scoring.
fn match_county(raw: &str) -> Option<String> {
    let folded = fold_diacritics(raw.trim_matches(|c: char| !c.is_alphanumeric() && c != '-'));
    if folded.is_empty() {
        return None;
    }
    let mut candidates = COUNTIES
        .iter()
        .filter(|c| fold_diacritics(c).starts_with(&folded));
    match (candidates.next(), candidates.next()) {
        (Some(county), None) => Some((*county).to_string()),
        _ => None,
    }
}

fn field(re: &Regex, content: &str) -> Option<String> {
    re.captures(content)
        .map(|c| collapse_whitespace(c.get(1).map_or("", |m| m.as_str())))
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// The replaceable default extractor for bulletin text payloads.
#[derive(Debug, Default)]
pub struct DecisionExtractor;

impl DecisionExtractor {
    pub fn new() -> Self {
        Self
    }

    fn extract_block(&self, content: &str, date: &str) -> Option<Decision> {
        let dossier_number = field(&DOSSIER_RE, content)?;

        let (requestor, quality, request_details) = match REQUEST_RE.captures(content) {
            Some(c) => (
                c.get(1).map(|m| collapse_whitespace(m.as_str())),
                c.get(2).map(|m| collapse_whitespace(m.as_str())),
                c.get(3).map(|m| collapse_whitespace(m.as_str())),
            ),
            None => (None, None, None),
        };

        Some(Decision {
            dossier_number,
            decision_number: field(&DECISION_NO_RE, content),
            pronounced_date: date.to_string(),
            firm_name: field(&FIRM_RE, content),
            address: field(&ADDRESS_RE, content),
            county: COUNTY_RE
                .captures(content)
                .and_then(|c| match_county(c.get(1).map_or("", |m| m.as_str()))),
            registration_code: field(&REG_CODE_RE, content),
            registration_order: field(&REG_ORDER_RE, content),
            euid: field(&EUID_RE, content),
            registrar: field(&REGISTRAR_RE, content),
            requestor,
            quality,
            request_details,
            disposition: field(&DISPOSITION_RE, content),
        })
    }
}

impl Extractor for DecisionExtractor {
    type Payload = String;
    type Record = Decision;

    fn extract(&self, payload: &String) -> Vec<Decision> {
        let mut decisions = Vec::new();
        for (i, captures) in DECISION_RE.captures_iter(payload).enumerate() {
            let content = captures.get(1).map_or("", |m| m.as_str());
            let date = captures.get(2).map_or("", |m| m.as_str());
            match self.extract_block(content, date) {
                Some(d) => decisions.push(d),
                None => log::debug!("decision block {i} skipped: no dossier number"),
            }
        }
        decisions
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_block(county_line: &str) -> String {
        format!(
            "R O M Â N I A\n\
             MINISTERUL JUSTIȚIEI\n\
             OFICIUL REGISTRULUI COMERȚULUI {county_line}\n\
             DOSAR NR. 18254/2024\n\
             ÎNCHEIERE nr. 4117\n\
             Firma: EXEMPLU TRADING S.R.L.\n\
             Sediul: Str. Memorandumului nr. 8, Cluj-Napoca\n\
             Cod unic de înregistrare: 4123456\n\
             Număr de ordine în registrul comerțului: J12/345/2024\n\
             Identificator unic la nivel european (EUID): ROONRC.J12/345/2024\n\
             Registratorul de registrul comerțului: Popescu-Maria Ana\n\
             Asupra cererii formulată de Ionescu Dan în calitate de administrator privind\n\
             înregistrarea unor mențiuni\nExaminând înscrisurile depuse\n\
             D I S P U N E\nAdmite cererea așa cum a fost formulată.\n\
             Registrator de registrul comerțului\n\
             Data: 15.03.2024\n"
        )
    }

    #[test]
    fn extracts_all_fields() {
        let text = sample_block("de pe lângă Tribunalul Cluj");
        let decisions = DecisionExtractor::new().extract(&text);
        assert_eq!(decisions.len(), 1);
        let d = &decisions[0];
        assert_eq!(d.dossier_number, "18254/2024");
        assert_eq!(d.decision_number.as_deref(), Some("4117"));
        assert_eq!(d.pronounced_date, "15.03.2024");
        assert_eq!(d.firm_name.as_deref(), Some("EXEMPLU TRADING S.R.L."));
        assert_eq!(d.county.as_deref(), Some("Cluj"));
        assert_eq!(d.registration_code.as_deref(), Some("4123456"));
        assert_eq!(d.euid.as_deref(), Some("ROONRC.J12/345/2024"));
        assert_eq!(d.registrar.as_deref(), Some("Popescu-Maria Ana"));
        assert_eq!(d.requestor.as_deref(), Some("Ionescu Dan"));
        assert_eq!(d.quality.as_deref(), Some("administrator"));
        assert_eq!(
            d.request_details.as_deref(),
            Some("înregistrarea unor mențiuni")
        );
        assert_eq!(
            d.disposition.as_deref(),
            Some("Admite cererea așa cum a fost formulată.")
        );
    }

    #[test]
    fn quality_clause_is_optional() {
        let text = sample_block("de pe lângă Tribunalul Cluj").replace(
            "formulată de Ionescu Dan în calitate de administrator privind",
            "formulată de Ionescu Dan privind",
        );
        let d = &DecisionExtractor::new().extract(&text)[0];
        assert_eq!(d.requestor.as_deref(), Some("Ionescu Dan"));
        assert_eq!(d.quality, None);
        assert_eq!(
            d.request_details.as_deref(),
            Some("înregistrarea unor mențiuni")
        );
    }

    #[test]
    fn multiple_blocks_in_one_payload() {
        let text = format!(
            "{}{}",
            sample_block("de pe lângă Tribunalul Cluj"),
            sample_block("de pe lângă Tribunalul Arad")
        );
        let decisions = DecisionExtractor::new().extract(&text);
        assert_eq!(decisions.len(), 2);
        assert_eq!(decisions[1].county.as_deref(), Some("Arad"));
    }

    #[test]
    fn block_without_dossier_is_skipped() {
        let good = sample_block("de pe lângă Tribunalul Cluj");
        let broken = good.replace("DOSAR NR. 18254/2024\n", "");
        let text = format!("{broken}{good}");
        let decisions = DecisionExtractor::new().extract(&text);
        assert_eq!(decisions.len(), 1);
    }

    #[test]
    fn empty_payload_extracts_nothing() {
        assert!(DecisionExtractor::new().extract(&String::new()).is_empty());
    }

    #[test]
    fn county_matching_folds_diacritics() {
        assert_eq!(match_county("Timiș").as_deref(), Some("Timiș"));
        assert_eq!(match_county("Timis").as_deref(), Some("Timiș"));
        assert_eq!(match_county("BUCUREȘTI").as_deref(), Some("București"));
        assert_eq!(match_county("Bistrița-Năsăud").as_deref(), Some("Bistrița-Năsăud"));
    }

    #[test]
    fn county_matching_resolves_multiword_prefix() {
        // "Tribunalul Satu Mare" only yields the first token
        assert_eq!(match_county("Satu").as_deref(), Some("Satu Mare"));
    }

    #[test]
    fn county_matching_rejects_unknown() {
        assert_eq!(match_county("Chișinău"), None);
        assert_eq!(match_county(""), None);
        assert_eq!(match_county("Specializat"), None);
    }

    #[test]
    fn trailing_punctuation_is_trimmed() {
        assert_eq!(match_county("Cluj,").as_deref(), Some("Cluj"));
    }
}
