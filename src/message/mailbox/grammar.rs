//! The RFC 5322 `mailbox` production, as written in configuration files
//!
//! Only `addr-spec` and `[display-name] angle-addr` are accepted. Comments,
//! folding and quoted local parts are not. Non ASCII characters are
//! allowed anywhere an atom is (RFC 6532).

use chumsky::{error::Cheap, prelude::*};

/// Display name, then the local part and domain of the address
pub(super) type Parsed = (Option<String>, (String, String));

// atext, extended with every non ASCII character
fn atext() -> impl Parser<char, char, Error = Cheap<char>> {
    filter(|c: &char| {
        c.is_ascii_alphanumeric() || "!#$%&'*+-/=?^_`{|}~".contains(*c) || !c.is_ascii()
    })
}

// dot-atom-text = 1*atext *("." 1*atext)
fn dot_atom() -> impl Parser<char, String, Error = Cheap<char>> {
    atext()
        .repeated()
        .at_least(1)
        .collect::<String>()
        .separated_by(just('.'))
        .at_least(1)
        .map(|atoms| atoms.join("."))
}

// quoted-string, the result is unescaped
fn quoted_string() -> impl Parser<char, String, Error = Cheap<char>> {
    let qtext = filter(|c: &char| !matches!(*c, '"' | '\\' | '\r' | '\n'));
    let quoted_pair = just('\\').ignore_then(filter(|c: &char| !matches!(*c, '\r' | '\n')));

    qtext
        .or(quoted_pair)
        .repeated()
        .delimited_by(just('"'), just('"'))
        .collect()
}

// domain-literal, kept with its brackets
fn domain_literal() -> impl Parser<char, String, Error = Cheap<char>> {
    filter(|c: &char| !matches!(*c, '[' | ']' | '\\') && !c.is_whitespace())
        .repeated()
        .at_least(1)
        .collect::<String>()
        .delimited_by(just('['), just(']'))
        .map(|literal| format!("[{literal}]"))
}

// addr-spec = local-part "@" domain
fn addr_spec() -> impl Parser<char, (String, String), Error = Cheap<char>> {
    dot_atom()
        .then_ignore(just('@'))
        .then(choice((dot_atom(), domain_literal())))
}

// display-name = phrase, dots are accepted in atoms (obs-phrase)
fn display_name() -> impl Parser<char, String, Error = Cheap<char>> {
    let atom = atext()
        .or(just('.'))
        .repeated()
        .at_least(1)
        .collect::<String>();

    choice((quoted_string(), atom))
        .padded()
        .repeated()
        .at_least(1)
        .map(|words| words.join(" "))
}

// mailbox = name-addr / addr-spec
pub(super) fn mailbox() -> impl Parser<char, Parsed, Error = Cheap<char>> {
    let angle_addr = addr_spec().delimited_by(just('<'), just('>'));
    let name_addr = display_name()
        .or_not()
        .then(angle_addr)
        .map(|(name, addr)| (name.filter(|name| !name.trim().is_empty()), addr));

    choice((name_addr, addr_spec().map(|addr| (None, addr))))
        .padded()
        .then_ignore(end())
}
