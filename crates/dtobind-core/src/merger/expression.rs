//! Arithmetic expressions over property variables
//!
//! Supports numeric literals, dotted variable names, `+ - * /`, unary minus and
//! parentheses. Expressions are compiled once to postfix order and evaluated
//! against a variable resolver.

use crate::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq)]
enum Operator {
    Add,
    Sub,
    Mul,
    Div,
    Neg,
}

impl Operator {
    fn precedence(self) -> u8 {
        match self {
            Operator::Add | Operator::Sub => 1,
            Operator::Mul | Operator::Div => 2,
            Operator::Neg => 3,
        }
    }

    fn is_unary(self) -> bool {
        self == Operator::Neg
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Number(f64),
    Variable(String),
    Operator(Operator),
    Open,
    Close,
}

#[derive(Debug, Clone, PartialEq)]
enum Step {
    Number(f64),
    Variable(String),
    Operator(Operator),
}

/// A compiled arithmetic expression
#[derive(Debug, Clone, PartialEq)]
pub struct Expression {
    source: String,
    steps: Vec<Step>,
}

impl Expression {
    pub fn parse(source: &str) -> Result<Self> {
        let tokens = tokenize(source)?;
        let steps = to_postfix(source, tokens)?;
        let expression = Self {
            source: source.to_string(),
            steps,
        };
        // A dry run with every variable at zero rejects malformed operator sequences.
        expression.evaluate(|_| 0.0)?;
        Ok(expression)
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// Variable names in order of first appearance
    pub fn variables(&self) -> Vec<&str> {
        let mut names: Vec<&str> = Vec::new();
        for step in &self.steps {
            if let Step::Variable(name) = step {
                if !names.contains(&name.as_str()) {
                    names.push(name);
                }
            }
        }
        names
    }

    pub fn evaluate<F>(&self, mut resolve: F) -> Result<f64>
    where
        F: FnMut(&str) -> f64,
    {
        let mut stack: Vec<f64> = Vec::with_capacity(self.steps.len());
        for step in &self.steps {
            match step {
                Step::Number(n) => stack.push(*n),
                Step::Variable(name) => stack.push(resolve(name)),
                Step::Operator(op) if op.is_unary() => {
                    let operand = stack.pop().ok_or_else(|| self.malformed())?;
                    stack.push(-operand);
                }
                Step::Operator(op) => {
                    let rhs = stack.pop().ok_or_else(|| self.malformed())?;
                    let lhs = stack.pop().ok_or_else(|| self.malformed())?;
                    stack.push(match op {
                        Operator::Add => lhs + rhs,
                        Operator::Sub => lhs - rhs,
                        Operator::Mul => lhs * rhs,
                        Operator::Div => lhs / rhs,
                        Operator::Neg => -rhs,
                    });
                }
            }
        }
        match (stack.pop(), stack.is_empty()) {
            (Some(result), true) => Ok(result),
            _ => Err(self.malformed()),
        }
    }

    fn malformed(&self) -> Error {
        Error::configuration(format!("malformed expression '{}'", self.source))
    }
}

fn tokenize(source: &str) -> Result<Vec<Token>> {
    let chars: Vec<char> = source.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        match c {
            ' ' | '\t' | '\n' | '\r' => i += 1,
            '(' => {
                tokens.push(Token::Open);
                i += 1;
            }
            ')' => {
                tokens.push(Token::Close);
                i += 1;
            }
            '+' | '-' | '*' | '/' => {
                // A minus is unary at the start or after an operator or an opening parenthesis.
                let unary = c == '-'
                    && matches!(tokens.last(), None | Some(Token::Operator(_)) | Some(Token::Open));
                let op = match c {
                    '+' => Operator::Add,
                    '-' if unary => Operator::Neg,
                    '-' => Operator::Sub,
                    '*' => Operator::Mul,
                    _ => Operator::Div,
                };
                tokens.push(Token::Operator(op));
                i += 1;
            }
            c if c.is_ascii_digit() || c == '.' => {
                let start = i;
                while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.') {
                    i += 1;
                }
                let literal: String = chars[start..i].iter().collect();
                let number = literal.parse().map_err(|_| {
                    Error::configuration(format!(
                        "invalid number '{}' in expression '{}'",
                        literal, source
                    ))
                })?;
                tokens.push(Token::Number(number));
            }
            c if c.is_alphabetic() || c == '_' || c == '@' => {
                let start = i;
                while i < chars.len()
                    && (chars[i].is_alphanumeric() || matches!(chars[i], '_' | '.' | '@'))
                {
                    i += 1;
                }
                tokens.push(Token::Variable(chars[start..i].iter().collect()));
            }
            other => {
                return Err(Error::configuration(format!(
                    "unexpected '{}' in expression '{}'",
                    other, source
                )))
            }
        }
    }
    if tokens.is_empty() {
        return Err(Error::configuration("empty expression"));
    }
    Ok(tokens)
}

/// Shunting-yard conversion to postfix order
fn to_postfix(source: &str, tokens: Vec<Token>) -> Result<Vec<Step>> {
    let unbalanced = || Error::configuration(format!("unbalanced parentheses in '{}'", source));
    let mut output = Vec::with_capacity(tokens.len());
    let mut operators: Vec<Token> = Vec::new();
    for token in tokens {
        match token {
            Token::Number(n) => output.push(Step::Number(n)),
            Token::Variable(name) => output.push(Step::Variable(name)),
            Token::Operator(op) => {
                while let Some(Token::Operator(top)) = operators.last() {
                    let top = *top;
                    // Unary minus is right-associative; binary operators are left-associative.
                    let pops = if op.is_unary() {
                        top.precedence() > op.precedence()
                    } else {
                        top.precedence() >= op.precedence()
                    };
                    if !pops {
                        break;
                    }
                    operators.pop();
                    output.push(Step::Operator(top));
                }
                operators.push(Token::Operator(op));
            }
            Token::Open => operators.push(Token::Open),
            Token::Close => loop {
                match operators.pop() {
                    Some(Token::Open) => break,
                    Some(Token::Operator(op)) => output.push(Step::Operator(op)),
                    _ => return Err(unbalanced()),
                }
            },
        }
    }
    while let Some(token) = operators.pop() {
        match token {
            Token::Operator(op) => output.push(Step::Operator(op)),
            _ => return Err(unbalanced()),
        }
    }
    Ok(output)
}
