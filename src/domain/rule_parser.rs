//! Rule list parser.
//!
//! Recursive descent parser for the textual rule language used in strategy
//! files:
//!
//! ```text
//! list      := rule (',' rule)*
//! rule      := INDICATOR ['(' integer ')'] ('>' | '<') comparand ['@' number]
//! comparand := number | PRICE
//! ```
//!
//! Errors carry the byte offset of the offending token.

use crate::domain::error::ParseError;
use crate::domain::indicator::macd::DEFAULT_SLOW;
use crate::domain::rule::{Comparand, Indicator, Operator, Rule};

struct Parser<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(input: &'a str) -> Self {
        Self { input, pos: 0 }
    }

    fn remaining(&self) -> &'a str {
        &self.input[self.pos..]
    }

    fn peek(&self) -> Option<char> {
        self.remaining().chars().next()
    }

    fn advance(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.pos += ch.len_utf8();
        Some(ch)
    }

    fn skip_whitespace(&mut self) {
        while let Some(ch) = self.peek() {
            if ch.is_whitespace() {
                self.advance();
            } else {
                break;
            }
        }
    }

    fn at_end(&mut self) -> bool {
        self.skip_whitespace();
        self.peek().is_none()
    }

    fn error(&self, message: impl Into<String>) -> ParseError {
        ParseError {
            message: message.into(),
            position: self.pos,
        }
    }

    fn found(&self) -> String {
        self.peek()
            .map(|c| format!("'{}'", c))
            .unwrap_or_else(|| "end of input".to_string())
    }

    fn expect_char(&mut self, expected: char) -> Result<(), ParseError> {
        self.skip_whitespace();
        match self.peek() {
            Some(ch) if ch == expected => {
                self.advance();
                Ok(())
            }
            _ => Err(self.error(format!("expected '{}', found {}", expected, self.found()))),
        }
    }

    fn consume_char(&mut self, expected: char) -> bool {
        self.skip_whitespace();
        if self.peek() == Some(expected) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn peek_word(&self) -> &'a str {
        let remaining = self.remaining();
        let end = remaining
            .find(|c: char| !(c.is_alphanumeric() || c == '_'))
            .unwrap_or(remaining.len());
        &remaining[..end]
    }

    fn parse_number(&mut self) -> Result<f64, ParseError> {
        self.skip_whitespace();
        let start = self.pos;
        let mut has_dot = false;
        let mut digits = 0;

        if self.peek() == Some('-') {
            self.advance();
        }

        while let Some(ch) = self.peek() {
            if ch.is_ascii_digit() {
                digits += 1;
                self.advance();
            } else if ch == '.' && !has_dot {
                has_dot = true;
                self.advance();
            } else {
                break;
            }
        }

        if digits == 0 {
            self.pos = start;
            return Err(self.error(format!("expected number, found {}", self.found())));
        }

        let num_str = &self.input[start..self.pos];
        num_str.parse::<f64>().map_err(|_| ParseError {
            message: format!("invalid number: {}", num_str),
            position: start,
        })
    }

    fn parse_integer(&mut self) -> Result<usize, ParseError> {
        self.skip_whitespace();
        let start = self.pos;
        while let Some(ch) = self.peek() {
            if ch.is_ascii_digit() {
                self.advance();
            } else {
                break;
            }
        }

        if start == self.pos {
            return Err(self.error(format!("expected integer, found {}", self.found())));
        }

        let num_str = &self.input[start..self.pos];
        num_str.parse::<usize>().map_err(|_| ParseError {
            message: format!("invalid integer: {}", num_str),
            position: start,
        })
    }

    fn parse_indicator(&mut self) -> Result<Indicator, ParseError> {
        self.skip_whitespace();
        let word = self.peek_word();
        let indicator = match word.to_ascii_uppercase().as_str() {
            "RSI" => Indicator::Rsi,
            "MACD" => Indicator::Macd,
            "SMA" => Indicator::Sma,
            "EMA" => Indicator::Ema,
            _ => {
                let shown = if word.is_empty() {
                    self.found()
                } else {
                    format!("'{}'", word)
                };
                return Err(self.error(format!(
                    "expected indicator (RSI, MACD, SMA, EMA), found {}",
                    shown
                )));
            }
        };
        self.pos += word.len();
        Ok(indicator)
    }

    fn parse_operator(&mut self) -> Result<Operator, ParseError> {
        self.skip_whitespace();
        match self.peek() {
            Some('>') => {
                self.advance();
                Ok(Operator::Gt)
            }
            Some('<') => {
                self.advance();
                Ok(Operator::Lt)
            }
            _ => Err(self.error(format!("expected operator '>' or '<', found {}", self.found()))),
        }
    }

    fn parse_comparand(&mut self) -> Result<Comparand, ParseError> {
        self.skip_whitespace();
        let word = self.peek_word();
        if word.eq_ignore_ascii_case("PRICE") {
            self.pos += word.len();
            return Ok(Comparand::Price);
        }
        self.parse_number().map(Comparand::Value)
    }

    fn parse_rule(&mut self) -> Result<Rule, ParseError> {
        let start = {
            self.skip_whitespace();
            self.pos
        };
        let indicator = self.parse_indicator()?;

        let period = if self.consume_char('(') {
            let period_pos = {
                self.skip_whitespace();
                self.pos
            };
            let period = self.parse_integer()?;
            if period == 0 {
                return Err(ParseError {
                    message: "period must be positive".into(),
                    position: period_pos,
                });
            }
            self.expect_char(')')?;
            period
        } else if indicator == Indicator::Macd {
            DEFAULT_SLOW
        } else {
            return Err(self.error(format!("expected '(' after {}, found {}", indicator, self.found())));
        };

        let operator = self.parse_operator()?;
        let comparand = self.parse_comparand()?;
        let weight = if self.consume_char('@') {
            self.parse_number()?
        } else {
            1.0
        };

        Rule::with_weight(indicator, period, operator, comparand, weight).map_err(|e| ParseError {
            message: e.to_string(),
            position: start,
        })
    }

    fn parse_list(&mut self) -> Result<Vec<Rule>, ParseError> {
        let mut rules = Vec::new();
        if self.at_end() {
            return Ok(rules);
        }
        loop {
            rules.push(self.parse_rule()?);
            if self.at_end() {
                return Ok(rules);
            }
            if !self.consume_char(',') {
                return Err(self.error(format!("expected ',' or end of input, found {}", self.found())));
            }
        }
    }
}

/// Parse a single rule, e.g. `RSI(14) < 30`.
pub fn parse_rule(input: &str) -> Result<Rule, ParseError> {
    let mut parser = Parser::new(input);
    let rule = parser.parse_rule()?;
    if !parser.at_end() {
        return Err(parser.error(format!("unexpected trailing input: {}", parser.found())));
    }
    Ok(rule)
}

/// Parse a comma-separated rule list. An empty or blank string is an empty list.
pub fn parse_rules(input: &str) -> Result<Vec<Rule>, ParseError> {
    Parser::new(input).parse_list()
}
