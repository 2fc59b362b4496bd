use chumsky::{prelude::*, regex::regex};

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    // insert Key Value
    Insert(i64, String),

    // update Key Value
    Update(i64, String),

    // upsert Key Value
    Upsert(i64, String),

    // delete Key
    Delete(i64),

    // query Key
    Query(i64),

    // range Key Key
    Range(i64, i64),

    List,
    Stats,
    Dump,
    Check,
    Help,

    // quit | exit
    Quit,
}

pub fn parser<'a>() -> impl Parser<'a, &'a str, Command, extra::Err<Rich<'a, char>>> {
    fn key<'a>() -> impl Parser<'a, &'a str, i64, extra::Err<Rich<'a, char>>> {
        regex(r"-?\d+")
            .try_map(|s: &str, span| s.parse::<i64>().map_err(|e| Rich::custom(span, e)))
            .padded()
    }

    fn value<'a>() -> impl Parser<'a, &'a str, String, extra::Err<Rich<'a, char>>> {
        regex(r"\S+").map(|s: &str| s.to_string()).padded()
    }

    let insert = just("insert")
        .padded()
        .ignore_then(key())
        .then(value())
        .map(|(k, v)| Command::Insert(k, v));

    let update = just("update")
        .padded()
        .ignore_then(key())
        .then(value())
        .map(|(k, v)| Command::Update(k, v));

    let upsert = just("upsert")
        .padded()
        .ignore_then(key())
        .then(value())
        .map(|(k, v)| Command::Upsert(k, v));

    let delete = just("delete").padded().ignore_then(key()).map(Command::Delete);

    let query = just("query").padded().ignore_then(key()).map(Command::Query);

    let range = just("range")
        .padded()
        .ignore_then(key())
        .then(key())
        .map(|(lower, upper)| Command::Range(lower, upper));

    let list = just("list").padded().to(Command::List);
    let stats = just("stats").padded().to(Command::Stats);
    let dump = just("dump").padded().to(Command::Dump);
    let check = just("check").padded().to(Command::Check);
    let help = just("help").padded().to(Command::Help);
    let quit = just("quit").or(just("exit")).padded().to(Command::Quit);

    choice((
        insert, update, upsert, delete, query, range, list, stats, dump, check, help, quit,
    ))
    .then_ignore(end())
}

/// Parse one shell line into a command
pub fn parse_command(input: &str) -> Result<Command, String> {
    parser().parse(input).into_result().map_err(|errs| {
        errs.iter()
            .map(|e| e.to_string())
            .collect::<Vec<_>>()
            .join("; ")
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_value_commands() {
        assert_eq!(
            parse_command("insert 42 hello"),
            Ok(Command::Insert(42, "hello".into()))
        );
        assert_eq!(
            parse_command("  update -7   world "),
            Ok(Command::Update(-7, "world".into()))
        );
        assert_eq!(
            parse_command("upsert 1 x"),
            Ok(Command::Upsert(1, "x".into()))
        );
    }

    #[test]
    fn test_key_commands() {
        assert_eq!(parse_command("delete 5"), Ok(Command::Delete(5)));
        assert_eq!(parse_command("query 0"), Ok(Command::Query(0)));
        assert_eq!(parse_command("range 10 20"), Ok(Command::Range(10, 20)));
    }

    #[test]
    fn test_bare_commands() {
        assert_eq!(parse_command("list"), Ok(Command::List));
        assert_eq!(parse_command("stats"), Ok(Command::Stats));
        assert_eq!(parse_command("dump"), Ok(Command::Dump));
        assert_eq!(parse_command("check"), Ok(Command::Check));
        assert_eq!(parse_command("help"), Ok(Command::Help));
        assert_eq!(parse_command("quit"), Ok(Command::Quit));
        assert_eq!(parse_command("exit"), Ok(Command::Quit));
    }

    #[test]
    fn test_parse_errors() {
        assert!(parse_command("insert 5").is_err());
        assert!(parse_command("delete five").is_err());
        assert!(parse_command("query 1 2").is_err());
        assert!(parse_command("drop 1").is_err());
        assert!(parse_command("insert 99999999999999999999 big").is_err());
    }
}
