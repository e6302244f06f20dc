//! Theme catalog – the stylesheets compiled into the binary.
//!
//! Every record's CSS is the shared base typography followed by the theme's
//! own rules. Lookups never fail: unknown names resolve to [`DEFAULT_THEME`].

use std::sync::OnceLock;

/// Theme used when a requested name is unknown.
pub const DEFAULT_THEME: &str = "Gaming";

/// Themes rendered on a dark page background.
pub const DARK_THEMES: [&str; 4] = ["Gaming", "Neon", "Luxury", "Tech"];

const BASE_CSS: &str = include_str!("themes/base.css");

/// (id, label, description, background, theme css)
const THEME_TABLE: [(&str, &str, &str, &str, &str); 9] = [
    (
        "Gaming",
        "🎮 Gaming",
        "Cyberpunk HUD - green/red",
        "#030303",
        include_str!("themes/gaming.css"),
    ),
    (
        "Corporate",
        "🏢 Corporate",
        "Professional - blue/white",
        "#ffffff",
        include_str!("themes/corporate.css"),
    ),
    (
        "Zen",
        "🧘 Zen",
        "Minimalist - earth tones",
        "#faf8f5",
        include_str!("themes/zen.css"),
    ),
    (
        "Neon",
        "💜 Neon",
        "Cyberpunk - pink/purple/cyan",
        "#08080f",
        include_str!("themes/neon.css"),
    ),
    (
        "Minimal",
        "⬜ Minimal",
        "Ultra clean - black/white",
        "#ffffff",
        include_str!("themes/minimal.css"),
    ),
    (
        "Luxury",
        "👑 Luxury",
        "Elegant - gold/black",
        "#0c0a09",
        include_str!("themes/luxury.css"),
    ),
    (
        "Nature",
        "🌿 Nature",
        "Organic - forest green",
        "#f0fdf4",
        include_str!("themes/nature.css"),
    ),
    (
        "Tech",
        "🔷 Tech",
        "Futuristic - tech blue",
        "#020617",
        include_str!("themes/tech.css"),
    ),
    (
        "Classic",
        "📜 Classic",
        "Traditional - serif/paper",
        "#fffbeb",
        include_str!("themes/classic.css"),
    ),
];

/// One catalog entry.
#[derive(Debug, Clone, PartialEq)]
pub struct ThemeRecord {
    pub id: &'static str,
    /// Display label shown in pickers.
    pub label: &'static str,
    pub description: &'static str,
    /// Page background colour.
    pub background: &'static str,
    /// Base CSS followed by the theme CSS.
    pub css: String,
}

impl ThemeRecord {
    pub fn is_dark(&self) -> bool {
        DARK_THEMES.contains(&self.id)
    }

    fn matches(&self, name: &str) -> bool {
        let name = name.trim();
        self.id.eq_ignore_ascii_case(name)
            || self.label == name
            || self
                .label
                .split_once(' ')
                .is_some_and(|(_, bare)| bare.eq_ignore_ascii_case(name))
    }
}

/// Ordered, immutable set of themes.
#[derive(Debug)]
pub struct ThemeCatalog {
    records: Vec<ThemeRecord>,
}

static CATALOG: OnceLock<ThemeCatalog> = OnceLock::new();

impl ThemeCatalog {
    fn build() -> Self {
        let records = THEME_TABLE
            .iter()
            .map(|&(id, label, description, background, css)| ThemeRecord {
                id,
                label,
                description,
                background,
                css: format!("{BASE_CSS}\n{css}"),
            })
            .collect();
        Self { records }
    }

    /// The process-wide catalog.
    pub fn global() -> &'static ThemeCatalog {
        CATALOG.get_or_init(Self::build)
    }

    /// Exact lookup by id or label, case-insensitive on the id.
    pub fn lookup(&self, name: &str) -> Option<&ThemeRecord> {
        self.records.iter().find(|r| r.matches(name))
    }

    /// Lookup falling back to the default theme.
    pub fn resolve(&self, name: &str) -> &ThemeRecord {
        match self.lookup(name) {
            Some(r) => r,
            None => {
                log::warn!("unknown theme {name:?}, using {DEFAULT_THEME}");
                self.default_record()
            }
        }
    }

    pub fn default_record(&self) -> &ThemeRecord {
        // The table is a non-empty constant whose first row is the default.
        &self.records[0]
    }

    /// Theme ids in catalog order.
    pub fn names(&self) -> Vec<&'static str> {
        self.records.iter().map(|r| r.id).collect()
    }

    pub fn css_for(&self, name: &str) -> &str {
        &self.resolve(name).css
    }

    pub fn iter(&self) -> impl Iterator<Item = &ThemeRecord> {
        self.records.iter()
    }
}

/// Resolve against the global catalog.
pub fn resolve(name: &str) -> &'static ThemeRecord {
    ThemeCatalog::global().resolve(name)
}

pub fn names() -> Vec<&'static str> {
    ThemeCatalog::global().names()
}

pub fn css_for(name: &str) -> &'static str {
    ThemeCatalog::global().css_for(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_keep_catalog_order() {
        assert_eq!(
            names(),
            vec![
                "Gaming", "Corporate", "Zen", "Neon", "Minimal", "Luxury", "Nature", "Tech",
                "Classic"
            ]
        );
    }

    #[test]
    fn default_is_first_and_gaming() {
        assert_eq!(ThemeCatalog::global().default_record().id, DEFAULT_THEME);
    }

    #[test]
    fn unknown_name_falls_back_to_default() {
        let r = resolve("nonexistent");
        assert_eq!(r.id, "Gaming");
        assert_eq!(r.background, "#030303");
        assert_eq!(css_for("nonexistent"), r.css);
    }

    #[test]
    fn labels_and_case_resolve() {
        assert_eq!(resolve("🏢 Corporate").id, "Corporate");
        assert_eq!(resolve("corporate").id, "Corporate");
        assert_eq!(resolve(" Tech ").id, "Tech");
    }

    #[test]
    fn css_starts_with_base() {
        for r in ThemeCatalog::global().iter() {
            assert!(r.css.starts_with(BASE_CSS), "{} lacks base css", r.id);
            assert!(r.css.len() > BASE_CSS.len());
        }
    }

    #[test]
    fn every_theme_styles_texture_and_tables() {
        assert!(BASE_CSS.contains("@page { size: A4; margin: 0; }"));
        assert!(BASE_CSS.contains("border-collapse: separate;"));
        for r in ThemeCatalog::global().iter() {
            let own = &r.css[BASE_CSS.len()..];
            for rule in [".page::before {", "table {", "thead {", "th {", "td {", "img {"] {
                assert!(own.contains(rule), "{} lacks {rule}", r.id);
            }
        }
    }

    #[test]
    fn base_rules_survive_the_font_import() {
        let sheet = crate::style::Stylesheet::parse(&resolve("Corporate").css);
        assert_eq!(sheet.var("--radius-md"), Some("10px"));
        let nodes = crate::dom::parse_html("<p>x</p>");
        let p = nodes[0].as_element().unwrap();
        let s = sheet.resolve(p, &crate::style::ComputedStyle::default(), &[]);
        assert!((s.line_height - 1.75).abs() < f32::EPSILON);
    }

    #[test]
    fn dark_set() {
        let dark: Vec<_> = ThemeCatalog::global()
            .iter()
            .filter(|r| r.is_dark())
            .map(|r| r.id)
            .collect();
        assert_eq!(dark, DARK_THEMES.to_vec());
    }
}
