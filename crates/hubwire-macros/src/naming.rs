/// How Rust method identifiers map to wire names.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RenameRule {
    /// Use the identifier as written.
    #[default]
    None,
    PascalCase,
    CamelCase,
    SnakeCase,
}

impl RenameRule {
    pub fn parse(rule: &str) -> Option<Self> {
        match rule {
            "PascalCase" => Some(RenameRule::PascalCase),
            "camelCase" => Some(RenameRule::CamelCase),
            "snake_case" => Some(RenameRule::SnakeCase),
            _ => None,
        }
    }

    pub fn apply(self, ident: &str) -> String {
        let ident = ident.strip_prefix("r#").unwrap_or(ident);
        match self {
            RenameRule::None | RenameRule::SnakeCase => ident.to_string(),
            RenameRule::PascalCase => pascal(ident),
            RenameRule::CamelCase => {
                let pascal = pascal(ident);
                let mut chars = pascal.chars();
                match chars.next() {
                    Some(first) => first.to_lowercase().chain(chars).collect(),
                    None => pascal,
                }
            }
        }
    }
}

fn pascal(ident: &str) -> String {
    ident
        .split('_')
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect()
}
