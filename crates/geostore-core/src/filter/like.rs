use super::FilterLike;

#[derive(Debug, Clone, Copy, PartialEq)]
enum Token {
    Any,
    One,
    Char(char),
}

fn tokenize(like: &FilterLike) -> Vec<Token> {
    let mut tokens = vec![];
    let mut chars = like.pattern.chars();

    while let Some(c) = chars.next() {
        let token = if Some(c) == like.escape {
            Token::Char(chars.next().unwrap_or(c))
        } else if c == like.wildcard {
            Token::Any
        } else if c == like.single {
            Token::One
        } else {
            Token::Char(c)
        };
        tokens.push(token);
    }

    tokens
}

pub(super) fn to_sql_pattern(like: &FilterLike) -> String {
    let mut out = String::with_capacity(like.pattern.len());

    for token in tokenize(like) {
        match token {
            Token::Any => out.push('%'),
            Token::One => out.push('_'),
            Token::Char(c @ ('%' | '_' | '\\')) => {
                out.push('\\');
                out.push(c);
            }
            Token::Char(c) => out.push(c),
        }
    }

    out
}

pub(super) fn matches(like: &FilterLike, text: &str) -> bool {
    let fold = |c: char| {
        if like.match_case {
            c
        } else {
            c.to_lowercase().next().unwrap_or(c)
        }
    };

    let pattern: Vec<Token> = tokenize(like)
        .into_iter()
        .map(|token| match token {
            Token::Char(c) => Token::Char(fold(c)),
            other => other,
        })
        .collect();
    let text: Vec<char> = text.chars().map(fold).collect();

    // Greedy match, backtracking to the last `Any`
    let (mut p, mut t) = (0, 0);
    let mut star: Option<(usize, usize)> = None;

    while t < text.len() {
        match pattern.get(p) {
            Some(Token::Any) => {
                star = Some((p, t));
                p += 1;
            }
            Some(Token::One) => {
                p += 1;
                t += 1;
            }
            Some(Token::Char(c)) if *c == text[t] => {
                p += 1;
                t += 1;
            }
            _ => match star {
                Some((sp, st)) => {
                    p = sp + 1;
                    t = st + 1;
                    star = Some((sp, st + 1));
                }
                None => return false,
            },
        }
    }

    pattern[p..].iter().all(|token| *token == Token::Any)
}
