// Custom tooltip template grammar, parsed once into an AST:
//
//   template := node*
//   node     := '{' node* '}'          conditional block
//             | '<' token '>'          value reference
//             | literal text
//   token    := 'xValue' | 'total.value' | 'total.name'
//             | 'row' N '.value' | 'row' N '.name'      (N is 1-based)
//
// A block is dropped wholesale when any row reference inside it points at
// a missing row or a zero value. Unrecognized tokens and unmatched text
// pass through unchanged; stray delimiter braces are stripped.

use anyhow::{anyhow, Result};
use nom::{
    branch::alt,
    bytes::complete::{tag, take_till1},
    character::complete::{anychar, char, digit1},
    combinator::{eof, map, map_res},
    multi::many0,
    sequence::{delimited, pair, preceded, terminated},
    IResult,
};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenRef {
    XValue,
    TotalValue,
    TotalName,
    RowValue(usize),
    RowName(usize),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Literal(String),
    Token(TokenRef),
    Block(Vec<Node>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Template {
    nodes: Vec<Node>,
}

/// One default-tooltip row exposed to the template, in the legend's
/// declared series order.
#[derive(Debug, Clone)]
pub struct TemplateRow {
    pub name: String,
    pub value: Option<f64>,
    pub formatted: String,
}

/// Evaluation context: the hovered x, the synthesized total, and the rows.
#[derive(Debug, Clone)]
pub struct TemplateContext {
    pub x_value: String,
    pub total_name: String,
    pub total_formatted: String,
    pub rows: Vec<TemplateRow>,
}

fn parse_row_ref(input: &str) -> IResult<&str, TokenRef> {
    let (input, index) = preceded(tag("row"), map_res(digit1, str::parse::<usize>))(input)?;
    let (input, field) = preceded(char('.'), alt((tag("value"), tag("name"))))(input)?;
    let token = if field == "value" {
        TokenRef::RowValue(index)
    } else {
        TokenRef::RowName(index)
    };
    Ok((input, token))
}

fn parse_token_ref(input: &str) -> IResult<&str, TokenRef> {
    alt((
        map(tag("xValue"), |_| TokenRef::XValue),
        map(tag("total.value"), |_| TokenRef::TotalValue),
        map(tag("total.name"), |_| TokenRef::TotalName),
        parse_row_ref,
    ))(input)
}

fn parse_token(input: &str) -> IResult<&str, Node> {
    map(
        delimited(char('<'), parse_token_ref, char('>')),
        Node::Token,
    )(input)
}

fn parse_block(input: &str) -> IResult<&str, Node> {
    map(
        delimited(char('{'), many0(parse_node), char('}')),
        Node::Block,
    )(input)
}

fn parse_literal(input: &str) -> IResult<&str, Node> {
    map(take_till1(|c| c == '{' || c == '}' || c == '<'), |s: &str| {
        Node::Literal(s.to_string())
    })(input)
}

fn parse_node(input: &str) -> IResult<&str, Node> {
    alt((parse_block, parse_token, parse_literal, parse_stray))(input)
}

// Leftover delimiters: braces are stripped, a lone '<' passes through.
fn parse_stray(input: &str) -> IResult<&str, Node> {
    map(anychar, |c| match c {
        '{' | '}' => Node::Literal(String::new()),
        other => Node::Literal(other.to_string()),
    })(input)
}

/// Parse a template string. Never fails on well-formed UTF-8 input; kept
/// fallible for symmetry with the formula parser.
pub fn parse_template(input: &str) -> Result<Template> {
    let (_, (nodes, _)) = pair(many0(parse_node), eof)(input)
        .map_err(|e| anyhow!("Invalid tooltip template: {}", e))?;
    Ok(Template { nodes })
}

impl Template {
    pub fn render(&self, ctx: &TemplateContext) -> String {
        render_nodes(&self.nodes, ctx)
    }
}

fn render_nodes(nodes: &[Node], ctx: &TemplateContext) -> String {
    let mut out = String::new();
    for node in nodes {
        match node {
            Node::Literal(text) => out.push_str(text),
            Node::Token(token) => out.push_str(&render_token(*token, ctx)),
            Node::Block(children) => {
                if block_dropped(children, ctx) {
                    debug!("tooltip template block dropped (zero or missing row)");
                } else {
                    out.push_str(&render_nodes(children, ctx));
                }
            }
        }
    }
    out
}

/// A block is a block-level conditional: it vanishes entirely when any row
/// reference inside it points at a zero value or a non-existent row.
fn block_dropped(children: &[Node], ctx: &TemplateContext) -> bool {
    children.iter().any(|node| match node {
        Node::Token(TokenRef::RowValue(n)) | Node::Token(TokenRef::RowName(n)) => {
            match row_at(ctx, *n) {
                Some(row) => row.value.unwrap_or(0.0) == 0.0,
                None => true,
            }
        }
        Node::Block(inner) => block_dropped(inner, ctx),
        _ => false,
    })
}

fn render_token(token: TokenRef, ctx: &TemplateContext) -> String {
    match token {
        TokenRef::XValue => ctx.x_value.clone(),
        TokenRef::TotalValue => ctx.total_formatted.clone(),
        TokenRef::TotalName => ctx.total_name.clone(),
        TokenRef::RowValue(n) => row_at(ctx, n)
            .map(|row| row.formatted.clone())
            .unwrap_or_default(),
        TokenRef::RowName(n) => row_at(ctx, n)
            .map(|row| row.name.clone())
            .unwrap_or_default(),
    }
}

// Row tokens are 1-based.
fn row_at(ctx: &TemplateContext, n: usize) -> Option<&TemplateRow> {
    n.checked_sub(1).and_then(|i| ctx.rows.get(i))
}
