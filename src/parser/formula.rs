// Expression parser for formula annotation layers.
//
// Grammar:
//   expr   := term (('+' | '-') term)*
//   term   := factor (('*' | '/') factor)*
//   factor := number | 'x' | '(' expr ')' | '-' factor

use anyhow::{anyhow, Result};
use nom::{
    branch::alt,
    bytes::complete::tag,
    character::complete::{char, multispace0},
    combinator::{eof, map},
    multi::many0,
    number::complete::double,
    sequence::{delimited, pair, preceded},
    IResult,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Number(f64),
    X,
    Neg(Box<Expr>),
    Binary {
        op: BinOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
}

impl Expr {
    /// Evaluate at a given x. Division by zero follows IEEE semantics;
    /// the annotation transformer filters non-finite results.
    pub fn eval(&self, x: f64) -> f64 {
        match self {
            Expr::Number(n) => *n,
            Expr::X => x,
            Expr::Neg(inner) => -inner.eval(x),
            Expr::Binary { op, lhs, rhs } => {
                let (l, r) = (lhs.eval(x), rhs.eval(x));
                match op {
                    BinOp::Add => l + r,
                    BinOp::Sub => l - r,
                    BinOp::Mul => l * r,
                    BinOp::Div => l / r,
                }
            }
        }
    }
}

fn ws<'a, F, O>(inner: F) -> impl FnMut(&'a str) -> IResult<&'a str, O>
where
    F: FnMut(&'a str) -> IResult<&'a str, O>,
{
    delimited(multispace0, inner, multispace0)
}

fn parse_factor(input: &str) -> IResult<&str, Expr> {
    alt((
        map(preceded(ws(char('-')), parse_factor), |e| {
            Expr::Neg(Box::new(e))
        }),
        delimited(ws(char('(')), parse_expr, ws(char(')'))),
        map(ws(tag("x")), |_| Expr::X),
        map(ws(double), Expr::Number),
    ))(input)
}

fn parse_term(input: &str) -> IResult<&str, Expr> {
    let (input, first) = parse_factor(input)?;
    let (input, rest) = many0(pair(ws(alt((char('*'), char('/')))), parse_factor))(input)?;
    Ok((input, fold_binary(first, rest)))
}

fn parse_expr(input: &str) -> IResult<&str, Expr> {
    let (input, first) = parse_term(input)?;
    let (input, rest) = many0(pair(ws(alt((char('+'), char('-')))), parse_term))(input)?;
    Ok((input, fold_binary(first, rest)))
}

fn fold_binary(first: Expr, rest: Vec<(char, Expr)>) -> Expr {
    rest.into_iter().fold(first, |lhs, (op, rhs)| {
        let op = match op {
            '+' => BinOp::Add,
            '-' => BinOp::Sub,
            '*' => BinOp::Mul,
            _ => BinOp::Div,
        };
        Expr::Binary {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        }
    })
}

/// Parse a complete formula expression.
pub fn parse_formula(input: &str) -> Result<Expr> {
    let (_, (expr, _)) = pair(parse_expr, eof)(input)
        .map_err(|e| anyhow!("Invalid formula '{}': {}", input, e))?;
    Ok(expr)
}
