//! Human-facing (Portuguese) descriptions of result groups and suggestions.
//!
//! Suggestion descriptions are picked at random from small template pools so
//! repeated requests read less mechanically. All pickers take the random
//! source as a parameter.

use rand::seq::SliceRandom;
use rand::Rng;

use lastro_core::Attribute;

/// Description of the final random sample.
pub const NO_RESULTS: &str = "Sem potenciais resultados para a sua pesquisa. Continue a Explorar!";

// =============================================================================
// FALLBACK GROUPS
// =============================================================================

/// Description of a single-column match group.
pub fn column_match(attribute: Attribute, term: &str) -> String {
    match attribute {
        Attribute::Title => format!("Projetos com '{}' no título", term),
        Attribute::Author => format!("Projetos de autores relacionados com '{}'", term),
        Attribute::Category => format!("Projetos do género '{}'", term),
        Attribute::Direction => format!("Projetos com direção de '{}'", term),
        Attribute::Sound => format!("Projetos com som de '{}'", term),
        Attribute::Production => format!("Projetos com produção de '{}'", term),
        Attribute::Support => format!("Projetos com apoio de '{}'", term),
        Attribute::Assistance => format!("Projetos com assistência de '{}'", term),
        Attribute::Research => format!("Projetos com pesquisa de '{}'", term),
        Attribute::Location => format!("Projetos em localizações relacionadas com '{}'", term),
        Attribute::Instruments => format!("Projetos com instrumentos '{}'", term),
        Attribute::Keywords => keyword_match(term),
        Attribute::Date => format!("Projetos com '{}' em {}", term, attribute),
    }
}

/// Description of the keyword-column group for a single term.
pub fn keyword_match(term: &str) -> String {
    format!("Outros projetos relacionados com '{}'", term)
}

/// Description of an OR-joined keyword query over several terms or words.
pub fn related_terms<S: AsRef<str>>(terms: &[S]) -> String {
    let joined: Vec<&str> = terms.iter().map(AsRef::as_ref).collect();
    format!("Projetos relacionados com '{}'", joined.join("', '"))
}

// =============================================================================
// SUGGESTIONS
// =============================================================================

fn direct_templates(attribute: Attribute) -> &'static [&'static str] {
    match attribute {
        Attribute::Author => &[
            "Mesmo autor",
            "Do mesmo criador",
            "Mesma autoria",
            "Semelhança no autor",
            "Mais deste autor",
        ],
        Attribute::Category => &[
            "Mesma categoria",
            "Categoria semelhante",
            "Mesmo género de projeto",
            "Tipo de projeto similar",
        ],
        Attribute::Location => &[
            "Mesmo local",
            "Mesmo lugar",
            "Geografia próxima",
            "Aconteceu por perto",
            "Mais neste sítio",
        ],
        Attribute::Date => &["Mesmo ano", "Época similar", "Pela mesma altura"],
        Attribute::Instruments => &[
            "Mesmos instrumentos",
            "Sons parecidos",
            "Instrumentos em comum",
            "Timbre aproximado",
        ],
        Attribute::Keywords => &[
            "Temas semelhantes",
            "Assuntos parecidos",
            "Temáticas próximas",
            "Conceitos parecidos",
        ],
        Attribute::Title => &[
            "Título semelhante",
            "Título parecido",
            "Título relacionado",
            "Títulos próximos",
        ],
        Attribute::Direction => &["Mesma realização", "Realização semelhante", "Mesmo realizador"],
        Attribute::Sound => &["Mesmo engenheiro de som", "Técnico de som em comum"],
        Attribute::Production => &["Mesma produção", "Mesmo produtor", "Produtor em comum"],
        Attribute::Support => &["Mesmo apoio", "Apoios em comum", "Mesmos apoiantes"],
        Attribute::Assistance => &["Mesma assistência", "Assistentes em comum"],
        Attribute::Research => &["Mesmos investigadores", "Pesquisadores em comum"],
    }
}

const SERIES_TEMPLATES: &[&str] = &[
    "Da mesma série",
    "Outros episódios",
    "Mais desta série",
    "Continuação da série",
];

/// Description of a direct suggestion on `attribute`.
pub fn describe_direct<R: Rng + ?Sized>(rng: &mut R, attribute: Attribute) -> String {
    pick(rng, direct_templates(attribute))
}

/// Description of a title-series suggestion.
pub fn describe_series<R: Rng + ?Sized>(rng: &mut R) -> String {
    pick(rng, SERIES_TEMPLATES)
}

fn pick<R: Rng + ?Sized>(rng: &mut R, templates: &[&str]) -> String {
    templates.choose(rng).copied().unwrap_or_default().to_string()
}

/// A noun naming an attribute, with its grammatical gender and number.
#[derive(Debug, Clone, Copy)]
struct Noun {
    term: &'static str,
    feminine: bool,
    plural: bool,
}

const fn noun(term: &'static str, feminine: bool, plural: bool) -> Noun {
    Noun {
        term,
        feminine,
        plural,
    }
}

const AUTHOR_NOUNS: &[Noun] = &[noun("autor", false, false), noun("criador", false, false)];

const CATEGORY_NOUNS: &[Noun] = &[
    noun("categoria", true, false),
    noun("género", false, false),
    noun("tipo", false, false),
];

const LOCATION_NOUNS: &[Noun] = &[
    noun("local", false, false),
    noun("localização", true, false),
    noun("lugar", false, false),
    noun("sítio", false, false),
];

const DATE_NOUNS: &[Noun] = &[
    noun("altura", true, false),
    noun("ano", false, false),
    noun("época", true, false),
];

const INSTRUMENT_NOUNS: &[Noun] = &[noun("instrumentos", false, true), noun("sonoridade", true, false)];

fn nouns(attribute: Attribute) -> &'static [Noun] {
    match attribute {
        Attribute::Author => AUTHOR_NOUNS,
        Attribute::Category => CATEGORY_NOUNS,
        Attribute::Location => LOCATION_NOUNS,
        Attribute::Date => DATE_NOUNS,
        Attribute::Instruments => INSTRUMENT_NOUNS,
        _ => &[],
    }
}

/// Inflect an adjective given its four forms (m.s., f.s., m.p., f.p.).
fn inflect(noun: Noun, forms: [&'static str; 4]) -> &'static str {
    match (noun.plural, noun.feminine) {
        (false, false) => forms[0],
        (false, true) => forms[1],
        (true, false) => forms[2],
        (true, true) => forms[3],
    }
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Description of a disruptive suggestion: same `matched`, different `excluded`.
pub fn describe_disruptive<R: Rng + ?Sized>(
    rng: &mut R,
    matched: Attribute,
    excluded: Attribute,
) -> String {
    let fallback = |attribute: Attribute| noun(attribute.column(), false, false);
    let m = nouns(matched)
        .choose(rng)
        .copied()
        .unwrap_or_else(|| fallback(matched));
    let e = nouns(excluded)
        .choose(rng)
        .copied()
        .unwrap_or_else(|| fallback(excluded));

    let m_name = m.term;
    let m_mesmo = inflect(m, ["mesmo", "mesma", "mesmos", "mesmas"]);
    let m_proximo = inflect(m, ["próximo", "próxima", "próximos", "próximas"]);
    let m_semelhante = inflect(m, ["semelhante", "semelhante", "semelhantes", "semelhantes"]);

    let e_name = e.term;
    let e_outro = inflect(e, ["outro", "outra", "outros", "outras"]);
    let e_distinto = inflect(e, ["distinto", "distinta", "distintos", "distintas"]);
    let e_diferente = inflect(e, ["diferente", "diferente", "diferentes", "diferentes"]);

    let templates = [
        format!("{} {}, {} {}", capitalize(e_outro), e_name, m_mesmo, m_name),
        format!("{} {}, {} {}", capitalize(e_name), e_diferente, m_name, m_proximo),
        format!("{} {}, {} {}", capitalize(e_name), e_diferente, m_name, m_semelhante),
        format!("{} {}, {} {}", capitalize(m_mesmo), m_name, e_name, e_diferente),
        format!("{} {}, {} {}", capitalize(m_mesmo), m_name, e_name, e_distinto),
        format!("{} {}, {} {}", capitalize(e_name), e_distinto, m_name, m_semelhante),
        format!("{} {}, {} {}", capitalize(e_outro), e_name, m_name, m_proximo),
        format!("{} {}, {} {}", capitalize(e_outro), e_name, m_name, m_semelhante),
        format!("{} {}, {} {}", capitalize(m_name), m_proximo, e_name, e_diferente),
        format!("{} {}, {} {}", capitalize(m_name), m_semelhante, e_name, e_diferente),
        format!("{} {}, {} {}", capitalize(m_name), m_proximo, e_outro, e_name),
        format!("{} {}, {} {}", capitalize(m_name), m_semelhante, e_outro, e_name),
    ];

    let index = rng.gen_range(0..templates.len());
    templates[index].clone()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_column_descriptions() {
        assert_eq!(
            column_match(Attribute::Title, "fado"),
            "Projetos com 'fado' no título"
        );
        assert_eq!(
            column_match(Attribute::Category, "fado"),
            "Projetos do género 'fado'"
        );
        assert_eq!(
            keyword_match("fado"),
            "Outros projetos relacionados com 'fado'"
        );
    }

    #[test]
    fn test_related_terms_joins_quoted() {
        assert_eq!(
            related_terms(&["Carlos", "Lima"]),
            "Projetos relacionados com 'Carlos', 'Lima'"
        );
    }

    #[test]
    fn test_direct_description_comes_from_attribute_pool() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..20 {
            let description = describe_direct(&mut rng, Attribute::Date);
            assert!(direct_templates(Attribute::Date).contains(&description.as_str()));
        }
    }

    #[test]
    fn test_every_attribute_has_direct_templates() {
        for attribute in Attribute::ALL {
            assert!(!direct_templates(attribute).is_empty(), "{}", attribute);
        }
    }

    #[test]
    fn test_series_description() {
        let mut rng = StdRng::seed_from_u64(1);
        assert!(SERIES_TEMPLATES.contains(&describe_series(&mut rng).as_str()));
    }

    #[test]
    fn test_noun_tables_per_attribute() {
        assert_eq!(nouns(Attribute::Author).len(), 2);
        assert_eq!(nouns(Attribute::Category).len(), 3);
        assert_eq!(nouns(Attribute::Location).len(), 4);
        assert_eq!(nouns(Attribute::Date).len(), 3);
        assert!(nouns(Attribute::Instruments)[0].plural);
        assert!(nouns(Attribute::Keywords).is_empty());
    }

    #[test]
    fn test_disruptive_agrees_in_gender_and_number() {
        let mut rng = StdRng::seed_from_u64(42);
        for _ in 0..50 {
            let description =
                describe_disruptive(&mut rng, Attribute::Instruments, Attribute::Author);
            assert!(!description.contains("mesmo instrumentos"));
            assert!(!description.contains("mesma instrumentos"));
            assert!(!description.contains("outra autor"));
            assert!(description.chars().next().is_some_and(char::is_uppercase));
        }
    }

    #[test]
    fn test_disruptive_names_both_attributes() {
        let mut rng = StdRng::seed_from_u64(3);
        let description = describe_disruptive(&mut rng, Attribute::Author, Attribute::Category);
        let lower = description.to_lowercase();
        assert!(lower.contains("autor") || lower.contains("criador"));
        assert!(lower.contains("categoria") || lower.contains("género") || lower.contains("tipo"));
    }

    #[test]
    fn test_capitalize_accented() {
        assert_eq!(capitalize("época"), "Época");
        assert_eq!(capitalize(""), "");
    }
}
