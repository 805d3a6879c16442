use std::collections::HashMap;

use nom::branch::alt;
use nom::bytes::complete::{escaped, tag, take_while, take_while1};
use nom::character::complete::{alpha1, char, digit1};
use nom::combinator::{all_consuming, map, opt, recognize};
use nom::error::{convert_error, ErrorKind, VerboseError, VerboseErrorKind};
use nom::multi::{many0, separated_list0};
use nom::sequence::{delimited, pair, separated_pair, tuple};

use common::property::PropertyValue;

use super::ast::{Source, Step, Traversal};
use super::{EDGE_BINDING, GRAPH_BINDING, VERTEX_BINDING};

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("{0}")]
    Message(String),
}

type IResult<'a, O> = nom::IResult<&'a str, O, VerboseError<&'a str>>;

fn ws<'a, F, O>(mut inner: F) -> impl FnMut(&'a str) -> IResult<'a, O>
where
    F: FnMut(&'a str) -> IResult<'a, O>,
{
    move |input| {
        let (input, _) = skip_ws_and_comments(input)?;
        let (input, out) = inner(input)?;
        let (input, _) = skip_ws_and_comments(input)?;
        Ok((input, out))
    }
}

fn skip_ws_and_comments(input: &str) -> IResult<()> {
    let mut rest = input;
    loop {
        let before_ws = rest;
        rest = rest.trim_start_matches(|c: char| c.is_whitespace());

        if let Some(stripped) = rest.strip_prefix("//") {
            if let Some(idx) = stripped.find('\n') {
                rest = &stripped[idx + 1..];
            } else {
                rest = "";
            }
            continue;
        }

        if let Some(stripped) = rest.strip_prefix("/*") {
            if let Some(idx) = stripped.find("*/") {
                rest = &stripped[idx + 2..];
                continue;
            } else {
                return Err(nom::Err::Failure(VerboseError {
                    errors: vec![(
                        rest,
                        VerboseErrorKind::Context("unterminated block comment"),
                    )],
                }));
            }
        }

        if rest == before_ws {
            break;
        }
    }

    Ok((rest, ()))
}

fn identifier(input: &str) -> IResult<&str> {
    recognize(pair(
        alt((alpha1, tag("_"))),
        take_while(|c: char| c.is_alphanumeric() || c == '_'),
    ))(input)
}

fn number_literal(input: &str) -> IResult<PropertyValue> {
    let fractional = tuple((char('.'), digit1));
    let (rest, raw) = recognize(tuple((opt(char('-')), digit1, opt(fractional))))(input)?;
    if raw.contains('.') {
        match raw.parse::<f64>() {
            Ok(value) => Ok((rest, PropertyValue::Float(value))),
            Err(_) => Err(nom::Err::Error(VerboseError {
                errors: vec![(input, VerboseErrorKind::Nom(ErrorKind::Float))],
            })),
        }
    } else {
        match raw.parse::<i64>() {
            Ok(value) => Ok((rest, PropertyValue::Integer(value))),
            Err(_) => Err(nom::Err::Error(VerboseError {
                errors: vec![(input, VerboseErrorKind::Nom(ErrorKind::Digit))],
            })),
        }
    }
}

fn quoted_string(delimiter: char) -> impl FnMut(&str) -> IResult<String> {
    move |input| {
        let (input, _) = char(delimiter)(input)?;
        let escape = alt((
            tag("\\\\"),
            tag("\\\""),
            tag("\\'"),
            tag("\\n"),
            tag("\\r"),
            tag("\\t"),
        ));
        let (input, content) = opt(escaped(
            take_while1(|c| c != delimiter && c != '\\'),
            '\\',
            escape,
        ))(input)?;
        let (input, _) = char(delimiter)(input)?;
        let raw = content.unwrap_or("");
        Ok((input, interpret_escapes(raw)))
    }
}

fn interpret_escapes(raw: &str) -> String {
    raw.replace("\\\\", "\\")
        .replace("\\\"", "\"")
        .replace("\\'", "'")
        .replace("\\n", "\n")
        .replace("\\r", "\r")
        .replace("\\t", "\t")
}

fn string_literal(input: &str) -> IResult<PropertyValue> {
    map(
        alt((quoted_string('"'), quoted_string('\''))),
        PropertyValue::String,
    )(input)
}

fn list_literal(input: &str) -> IResult<PropertyValue> {
    map(
        delimited(
            ws(char('[')),
            separated_list0(ws(char(',')), ws(value_literal)),
            ws(char(']')),
        ),
        PropertyValue::List,
    )(input)
}

fn map_literal(input: &str) -> IResult<PropertyValue> {
    let key = alt((map(identifier, str::to_string), quoted_string('"')));
    let entry = separated_pair(ws(key), ws(char(':')), ws(value_literal));
    map(
        delimited(
            ws(char('{')),
            separated_list0(ws(char(',')), entry),
            ws(char('}')),
        ),
        |pairs| PropertyValue::Map(pairs.into_iter().collect()),
    )(input)
}

fn keyword_literal(input: &str) -> IResult<PropertyValue> {
    let (rest, word) = identifier(input)?;
    match word {
        "true" => Ok((rest, PropertyValue::Boolean(true))),
        "false" => Ok((rest, PropertyValue::Boolean(false))),
        "null" => Ok((rest, PropertyValue::Null)),
        _ => Err(nom::Err::Error(VerboseError {
            errors: vec![(input, VerboseErrorKind::Context("expected literal"))],
        })),
    }
}

fn value_literal(input: &str) -> IResult<PropertyValue> {
    alt((
        string_literal,
        list_literal,
        map_literal,
        number_literal,
        keyword_literal,
    ))(input)
}

fn source(input: &str) -> IResult<Source> {
    let (input, _) = skip_ws_and_comments(input)?;
    if let Ok((rest, word)) = identifier(input) {
        let source = match word {
            GRAPH_BINDING => Source::Graph,
            VERTEX_BINDING => Source::Vertex,
            EDGE_BINDING => Source::Edge,
            "true" => Source::Literal(PropertyValue::Boolean(true)),
            "false" => Source::Literal(PropertyValue::Boolean(false)),
            "null" => Source::Literal(PropertyValue::Null),
            _ => {
                return Err(nom::Err::Failure(VerboseError {
                    errors: vec![(input, VerboseErrorKind::Context("unknown binding"))],
                }))
            }
        };
        return Ok((rest, source));
    }
    map(value_literal, Source::Literal)(input)
}

fn step(input: &str) -> IResult<Step> {
    let (after_dot, _) = ws(char('.'))(input)?;
    let (after_name, name) = identifier(after_dot)?;
    let (rest, args) = delimited(
        ws(char('(')),
        separated_list0(ws(char(',')), ws(value_literal)),
        ws(char(')')),
    )(after_name)?;
    let built = build_step(after_dot, name, args)?;
    Ok((rest, built))
}

const STEP_NAMES: [&str; 20] = [
    "V",
    "E",
    "out",
    "in",
    "both",
    "outE",
    "inE",
    "bothE",
    "outV",
    "inV",
    "has",
    "values",
    "id",
    "label",
    "limit",
    "count",
    "addVertex",
    "addEdge",
    "remove",
    "clear",
];

fn build_step<'a>(
    at: &'a str,
    name: &'a str,
    mut args: Vec<PropertyValue>,
) -> Result<Step, nom::Err<VerboseError<&'a str>>> {
    let fail = |context: &'static str| {
        nom::Err::Failure(VerboseError {
            errors: vec![(at, VerboseErrorKind::Context(context))],
        })
    };

    let step = match (name, args.len()) {
        ("V", 0) => Step::Vertices,
        ("E", 0) => Step::Edges,
        ("out", 0) => Step::Out(None),
        ("out", 1) => Step::Out(Some(string_arg(args.remove(0)).ok_or_else(|| fail("out expects a label string"))?)),
        ("in", 0) => Step::In(None),
        ("in", 1) => Step::In(Some(string_arg(args.remove(0)).ok_or_else(|| fail("in expects a label string"))?)),
        ("both", 0) => Step::Both(None),
        ("both", 1) => Step::Both(Some(string_arg(args.remove(0)).ok_or_else(|| fail("both expects a label string"))?)),
        ("outE", 0) => Step::OutE(None),
        ("outE", 1) => Step::OutE(Some(string_arg(args.remove(0)).ok_or_else(|| fail("outE expects a label string"))?)),
        ("inE", 0) => Step::InE(None),
        ("inE", 1) => Step::InE(Some(string_arg(args.remove(0)).ok_or_else(|| fail("inE expects a label string"))?)),
        ("bothE", 0) => Step::BothE(None),
        ("bothE", 1) => Step::BothE(Some(string_arg(args.remove(0)).ok_or_else(|| fail("bothE expects a label string"))?)),
        ("outV", 0) => Step::OutV,
        ("inV", 0) => Step::InV,
        ("has", 2) => {
            let value = args.remove(1);
            let key = string_arg(args.remove(0)).ok_or_else(|| fail("has expects a key string"))?;
            Step::Has { key, value }
        }
        ("values", 1) => Step::Values(
            string_arg(args.remove(0)).ok_or_else(|| fail("values expects a key string"))?,
        ),
        ("id", 0) => Step::Id,
        ("label", 0) => Step::Label,
        ("limit", 1) => Step::Limit(
            limit_arg(args.remove(0)).ok_or_else(|| fail("limit expects a non-negative integer"))?,
        ),
        ("count", 0) => Step::Count,
        ("addVertex", 0) => Step::AddVertex(HashMap::new()),
        ("addVertex", 1) => Step::AddVertex(
            map_arg(args.remove(0)).ok_or_else(|| fail("addVertex expects a property map"))?,
        ),
        ("addEdge", 3) | ("addEdge", 4) => {
            let properties = if args.len() == 4 {
                map_arg(args.remove(3)).ok_or_else(|| fail("addEdge expects a property map"))?
            } else {
                HashMap::new()
            };
            let target = args.remove(2);
            let label =
                string_arg(args.remove(1)).ok_or_else(|| fail("addEdge expects a label string"))?;
            let source = args.remove(0);
            Step::AddEdge {
                source,
                label,
                target,
                properties,
            }
        }
        ("remove", 0) => Step::Remove,
        ("clear", 0) => Step::Clear,
        _ => {
            if STEP_NAMES.contains(&name) {
                return Err(fail("wrong number of arguments"));
            }
            return Err(fail("unknown step"));
        }
    };

    Ok(step)
}

fn string_arg(value: PropertyValue) -> Option<String> {
    match value {
        PropertyValue::String(text) => Some(text),
        _ => None,
    }
}

fn map_arg(value: PropertyValue) -> Option<HashMap<String, PropertyValue>> {
    match value {
        PropertyValue::Map(entries) => Some(entries),
        _ => None,
    }
}

fn limit_arg(value: PropertyValue) -> Option<usize> {
    match value {
        PropertyValue::Integer(count) if count >= 0 => Some(count as usize),
        _ => None,
    }
}

fn traversal(input: &str) -> IResult<Traversal> {
    let (input, source) = source(input)?;
    let (input, steps) = many0(step)(input)?;
    let (input, _) = skip_ws_and_comments(input)?;
    Ok((input, Traversal { source, steps }))
}

pub fn parse_script(input: &str) -> Result<Traversal, ParseError> {
    match all_consuming(traversal)(input) {
        Ok((_, parsed)) => Ok(parsed),
        Err(nom::Err::Error(err)) | Err(nom::Err::Failure(err)) => {
            Err(ParseError::Message(convert_error(input, err)))
        }
        Err(nom::Err::Incomplete(_)) => Err(ParseError::Message("unexpected end of input".into())),
    }
}
