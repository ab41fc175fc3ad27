//! Noise vocabulary: French stopwords plus helpdesk-specific junk tokens.

use std::collections::HashSet;

use crate::config::NoiseConfig;

/// NLTK French stopword list.
pub const FRENCH_STOPWORDS: &[&str] = &[
    "au", "aux", "avec", "ce", "ces", "dans", "de", "des", "du", "elle", "en", "et", "eux", "il",
    "ils", "je", "la", "le", "les", "leur", "lui", "ma", "mais", "me", "même", "mes", "moi", "mon",
    "ne", "nos", "notre", "nous", "on", "ou", "par", "pas", "pour", "qu", "que", "qui", "sa", "se",
    "ses", "son", "sur", "ta", "te", "tes", "toi", "ton", "tu", "un", "une", "vos", "votre", "vous",
    "c", "d", "j", "l", "à", "m", "n", "s", "t", "y", "été", "étée", "étées", "étés", "étant",
    "étante", "étants", "étantes", "suis", "es", "est", "sommes", "êtes", "sont", "serai", "seras",
    "sera", "serons", "serez", "seront", "serais", "serait", "serions", "seriez", "seraient",
    "étais", "était", "étions", "étiez", "étaient", "fus", "fut", "fûmes", "fûtes", "furent",
    "sois", "soit", "soyons", "soyez", "soient", "fusse", "fusses", "fût", "fussions", "fussiez",
    "fussent", "ayant", "ayante", "ayantes", "ayants", "eu", "eue", "eues", "eus", "ai", "as",
    "avons", "avez", "ont", "aurai", "auras", "aura", "aurons", "aurez", "auront", "aurais",
    "aurait", "aurions", "auriez", "auraient", "avais", "avait", "avions", "aviez", "avaient",
    "eut", "eûmes", "eûtes", "eurent", "aie", "aies", "ait", "ayons", "ayez", "aient", "eusse",
    "eusses", "eût", "eussions", "eussiez", "eussent",
];

/// Abbreviations and filler words that show up in GLPI titles.
pub const HELPDESK_JUNK: &[&str] = &[
    "dr", "cs", "mr", "mme", "rdv", "mvt", "re", "vers", "non", "oui",
];

pub const MONTHS: &[&str] = &[
    "janvier", "février", "fevrier", "mars", "avril", "mai", "juin", "juillet", "août", "aout",
    "septembre", "octobre", "novembre", "décembre", "decembre",
];

/// Statuses GLPI uses for tickets that no longer need work.
pub const RESOLVED_STATUSES: &[&str] = &["Résolu", "Clos", "Fermé", "Terminé"];

/// Builds the exclusion set shared by every tokenizer, then layers `extra` on top.
pub(crate) fn build_exclusion_set(config: &NoiseConfig, extra: &[String]) -> HashSet<String> {
    let mut set: HashSet<String> = FRENCH_STOPWORDS
        .iter()
        .chain(MONTHS.iter())
        .map(|w| w.to_string())
        .collect();

    if config.include_helpdesk_junk {
        set.extend(HELPDESK_JUNK.iter().map(|w| w.to_string()));
    }
    set.extend(config.custom_junk.iter().map(|w| w.to_lowercase()));

    if config.exclude_day_numbers {
        set.extend((1..=31).map(|day| format!("{:02}", day)));
    }
    if let Some((first, last)) = config.year_range {
        set.extend((first..=last).map(|year| year.to_string()));
    }

    set.extend(extra.iter().map(|w| w.to_lowercase()));
    set
}
