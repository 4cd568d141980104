//! Grammar string tokenization.

/// A single token of a usage grammar string.
///
/// A grammar string is a run of space-separated tokens. A bare token is a
/// [`Token::Literal`] carrying one or more `|`-separated spellings of one
/// fixed grammar position; a token wrapped in `<...>` is a
/// [`Token::Placeholder`] bound positionally to the next eligible formal
/// parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    /// One fixed grammar position with one or more alternative spellings.
    Literal {
        /// The `|`-separated spellings, in declared order.
        aliases: Vec<String>,
    },
    /// The text inside `<...>`, bound to the next formal parameter.
    Placeholder {
        /// The placeholder name, without the angle brackets.
        name: String,
    },
}

impl Token {
    /// Whether this token is a fixed literal position.
    pub fn is_node(&self) -> bool {
        matches!(self, Token::Literal { .. })
    }

    /// Render the token the way it appears in a usage line: literals as
    /// their first alternative, placeholders re-wrapped in `<...>`.
    pub fn render(&self) -> String {
        match self {
            Token::Literal { aliases } => aliases.first().cloned().unwrap_or_default(),
            Token::Placeholder { name } => format!("<{name}>"),
        }
    }
}

/// Split a grammar string into tokens.
///
/// Never fails: runs of spaces between tokens are skipped, and an
/// unterminated `<placeholder` captures to the end of the input.
pub fn tokenize(grammar: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut rest = grammar;

    loop {
        rest = rest.trim_start_matches(' ');
        if rest.is_empty() {
            break;
        }

        if let Some(stripped) = rest.strip_prefix('<') {
            let (name, tail) = match stripped.find('>') {
                Some(end) => (&stripped[..end], &stripped[end + 1..]),
                None => (stripped, ""),
            };
            tokens.push(Token::Placeholder {
                name: name.to_string(),
            });
            rest = tail;
        } else {
            let end = rest.find(' ').unwrap_or(rest.len());
            let (word, tail) = rest.split_at(end);
            tokens.push(Token::Literal {
                aliases: word.split('|').map(str::to_string).collect(),
            });
            rest = tail;
        }
    }

    tokens
}
