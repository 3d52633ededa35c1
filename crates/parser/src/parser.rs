/// Winnow-based parser for the compact history text format.
///
/// Grammar:
/// ```text
/// history   = line*
/// line      = [op] [comment] NEWLINE
/// op        = process ":" kind fun value
/// process   = INTEGER | "n" | "nemesis"
/// kind      = "invoke" | "ok" | "fail" | "info"
/// fun       = "read" | "write" | "cas" | "add" | "acquire"
///           | "release" | "txn" | "start" | "stop"
/// value     = "_" | INTEGER | "[" [ints | mops] "]"
/// ints      = INTEGER (WS INTEGER)*
/// mops      = mop ("," mop)*
/// mop       = "r" key ("_" | INTEGER | "[" ints? "]")
///           | "w" key INTEGER
///           | "append" key INTEGER
///           | "cas" key INTEGER INTEGER
/// ```
use verdict_core::history::{Fun, Kind, Mop, Op, Process, Value};
use verdict_core::History;
use winnow::ascii::{dec_int, dec_uint, newline};
use winnow::combinator::{alt, opt, separated};
use winnow::prelude::*;
use winnow::token::{literal, one_of, take_while};
use winnow::ModalResult;

// ---------------------------------------------------------------------------
// Public error type
// ---------------------------------------------------------------------------

/// A parse error with human-readable location information.
#[derive(Debug, Clone)]
pub struct ParseError {
    pub message: String,
    pub line: usize,
    pub column: usize,
}

impl core::fmt::Display for ParseError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(
            f,
            "parse error at line {}, column {}: {}",
            self.line, self.column, self.message
        )
    }
}

impl std::error::Error for ParseError {}

// ---------------------------------------------------------------------------
// Public entry point
// ---------------------------------------------------------------------------

/// Parse a compact history into an indexed [`History`].
///
/// Operations get dense indexes in text order; `time` is the op's
/// position, which keeps `parse(format(h)) = h` on parser-produced
/// histories.
///
/// # Errors
///
/// Returns a [`ParseError`] with line/column information when the input
/// does not conform to the grammar.
pub fn parse_history(input: &str) -> Result<History, ParseError> {
    let original = input;
    let mut stream: &str = input;
    match history_parser.parse_next(&mut stream) {
        Ok(mut ops) => {
            for (position, op) in ops.iter_mut().enumerate() {
                op.time = i64::try_from(position).unwrap_or(i64::MAX);
            }
            Ok(History::index(ops))
        }
        Err(e) => {
            let consumed = original.len().saturating_sub(stream.len());
            let (line, column) = offset_to_line_col(original, consumed);
            Err(ParseError {
                message: e.to_string(),
                line,
                column,
            })
        }
    }
}

/// Convert a byte offset into 1-based (line, column).
fn offset_to_line_col(input: &str, offset: usize) -> (usize, usize) {
    let safe_offset = offset.min(input.len());
    let prefix = &input[..safe_offset];
    let line = prefix.bytes().filter(|&b| b == b'\n').count() + 1;
    let column = prefix
        .rfind('\n')
        .map_or_else(|| prefix.len() + 1, |pos| prefix.len() - pos);
    (line, column)
}

// ---------------------------------------------------------------------------
// Whitespace and trivia
// ---------------------------------------------------------------------------

fn inline_ws(input: &mut &str) -> ModalResult<()> {
    take_while(1.., |c: char| c == ' ' || c == '\t')
        .void()
        .parse_next(input)
}

fn opt_inline_ws(input: &mut &str) -> ModalResult<()> {
    take_while(0.., |c: char| c == ' ' || c == '\t')
        .void()
        .parse_next(input)
}

fn comment(input: &mut &str) -> ModalResult<()> {
    (literal("//"), take_while(0.., |c: char| c != '\n'))
        .void()
        .parse_next(input)
}

/// Consume blank lines, comments and surrounding whitespace.
fn skip_trivia(input: &mut &str) -> ModalResult<()> {
    loop {
        let before = input.len();
        opt_inline_ws(input)?;
        let _ = opt(comment).parse_next(input)?;
        let _ = opt(newline).parse_next(input)?;
        if input.len() == before {
            return Ok(());
        }
    }
}

// ---------------------------------------------------------------------------
// Leaf parsers
// ---------------------------------------------------------------------------

/// An identifier: a letter, then letters, digits, dashes or underscores.
fn ident<'a>(input: &mut &'a str) -> ModalResult<&'a str> {
    (
        one_of(|c: char| c.is_ascii_alphabetic()),
        take_while(0.., |c: char| {
            c.is_ascii_alphanumeric() || c == '-' || c == '_'
        }),
    )
        .take()
        .parse_next(input)
}

fn process(input: &mut &str) -> ModalResult<Process> {
    alt((
        dec_uint.map(Process::Client),
        literal("nemesis").value(Process::Nemesis),
        literal("n").value(Process::Nemesis),
    ))
    .parse_next(input)
}

fn kind(input: &mut &str) -> ModalResult<Kind> {
    ident
        .verify_map(|s| match s {
            "invoke" => Some(Kind::Invoke),
            "ok" => Some(Kind::Ok),
            "fail" => Some(Kind::Fail),
            "info" => Some(Kind::Info),
            _ => None,
        })
        .parse_next(input)
}

fn fun(input: &mut &str) -> ModalResult<Fun> {
    ident
        .verify_map(|s| match s {
            "read" => Some(Fun::Read),
            "write" => Some(Fun::Write),
            "cas" => Some(Fun::Cas),
            "add" => Some(Fun::Add),
            "acquire" => Some(Fun::Acquire),
            "release" => Some(Fun::Release),
            "txn" => Some(Fun::Txn),
            "start" => Some(Fun::Start),
            "stop" => Some(Fun::Stop),
            _ => None,
        })
        .parse_next(input)
}

// ---------------------------------------------------------------------------
// Values and micro-ops
// ---------------------------------------------------------------------------

fn int_list(input: &mut &str) -> ModalResult<Vec<i64>> {
    let _ = literal("[").parse_next(input)?;
    opt_inline_ws(input)?;
    let items = opt(separated(1.., dec_int::<_, i64, _>, inline_ws))
        .parse_next(input)?
        .unwrap_or_default();
    opt_inline_ws(input)?;
    let _ = literal("]").parse_next(input)?;
    Ok(items)
}

fn mop_read(input: &mut &str) -> ModalResult<Mop> {
    let _ = (literal("r"), inline_ws).parse_next(input)?;
    let key = ident.parse_next(input)?;
    inline_ws(input)?;
    let value = alt((
        literal("_").value(None),
        dec_int::<_, i64, _>.map(|v| Some(Value::Int(v))),
        int_list.map(|items| Some(Value::ints(items))),
    ))
    .parse_next(input)?;
    Ok(Mop::Read {
        key: key.to_string(),
        value,
    })
}

fn mop_write(input: &mut &str) -> ModalResult<Mop> {
    let _ = (literal("w"), inline_ws).parse_next(input)?;
    let key = ident.parse_next(input)?;
    inline_ws(input)?;
    let value = dec_int.parse_next(input)?;
    Ok(Mop::write(key, value))
}

fn mop_append(input: &mut &str) -> ModalResult<Mop> {
    let _ = (literal("append"), inline_ws).parse_next(input)?;
    let key = ident.parse_next(input)?;
    inline_ws(input)?;
    let element = dec_int.parse_next(input)?;
    Ok(Mop::append(key, element))
}

fn mop_cas(input: &mut &str) -> ModalResult<Mop> {
    let _ = (literal("cas"), inline_ws).parse_next(input)?;
    let key = ident.parse_next(input)?;
    inline_ws(input)?;
    let old = dec_int.parse_next(input)?;
    inline_ws(input)?;
    let new = dec_int.parse_next(input)?;
    Ok(Mop::cas(key, old, new))
}

fn mop(input: &mut &str) -> ModalResult<Mop> {
    alt((mop_append, mop_cas, mop_read, mop_write)).parse_next(input)
}

fn bracket_value(input: &mut &str) -> ModalResult<Value> {
    let _ = literal("[").parse_next(input)?;
    opt_inline_ws(input)?;
    if opt(literal("]")).parse_next(input)?.is_some() {
        return Ok(Value::List(Vec::new()));
    }
    let value = if input.chars().next().is_some_and(|c| c.is_ascii_alphabetic()) {
        let mops: Vec<Mop> =
            separated(1.., mop, (opt_inline_ws, literal(","), opt_inline_ws)).parse_next(input)?;
        Mop::to_list(&mops)
    } else {
        let items: Vec<i64> =
            separated(1.., dec_int::<_, i64, _>, inline_ws).parse_next(input)?;
        Value::ints(items)
    };
    opt_inline_ws(input)?;
    let _ = literal("]").parse_next(input)?;
    Ok(value)
}

fn value(input: &mut &str) -> ModalResult<Value> {
    alt((
        literal("_").value(Value::Nil),
        dec_int::<_, i64, _>.map(Value::Int),
        bracket_value,
    ))
    .parse_next(input)
}

// ---------------------------------------------------------------------------
// Lines
// ---------------------------------------------------------------------------

fn op_line(input: &mut &str) -> ModalResult<Op> {
    let process = process.parse_next(input)?;
    opt_inline_ws(input)?;
    let _ = literal(":").parse_next(input)?;
    opt_inline_ws(input)?;
    let kind = kind.parse_next(input)?;
    inline_ws(input)?;
    let f = fun.parse_next(input)?;
    inline_ws(input)?;
    let value = value.parse_next(input)?;
    Ok(Op {
        index: 0,
        time: 0,
        process,
        kind,
        f,
        value,
        error: None,
    })
}

fn history_parser(input: &mut &str) -> ModalResult<Vec<Op>> {
    let mut ops = Vec::new();
    loop {
        skip_trivia(input)?;
        if input.is_empty() {
            return Ok(ops);
        }
        ops.push(op_line.parse_next(input)?);
        opt_inline_ws(input)?;
        let _ = opt(comment).parse_next(input)?;
        if input.is_empty() {
            return Ok(ops);
        }
        let _ = newline.parse_next(input)?;
    }
}
