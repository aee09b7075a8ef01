//! Query parser.
//!
//! Recursive descent over the token stream, producing a [`Query`]. Parse
//! errors report the expected token class and the byte position.

use quiver_common::error::QueryError;
use quiver_common::types::Value;
use quiver_common::{Error, Result};
use quiver_core::graph::Direction;

use super::ast::{
    CompareOp, Expr, Hop, NodePattern, OrderItem, Pattern, Query, RelPattern, ReturnItem,
};
use super::lexer::{Lexer, Token, TokenKind};

/// Parses a query string into its AST.
///
/// # Errors
///
/// Returns a syntax error for any lexical or grammatical violation.
pub fn parse(query: &str) -> Result<Query> {
    Parser::new(query)?.parse()
}

/// Query parser.
pub struct Parser<'a> {
    lexer: Lexer<'a>,
    current: Token,
}

impl<'a> Parser<'a> {
    /// Creates a parser for the given query.
    ///
    /// # Errors
    ///
    /// Returns a syntax error if the first token is malformed.
    pub fn new(query: &'a str) -> Result<Self> {
        let mut lexer = Lexer::new(query);
        let current = lexer.next_token()?;
        Ok(Self { lexer, current })
    }

    /// Parses the whole query.
    ///
    /// # Errors
    ///
    /// Returns a syntax error describing the expected token class.
    pub fn parse(&mut self) -> Result<Query> {
        self.expect(TokenKind::Match)?;
        let patterns = self.parse_pattern_list()?;

        let where_clause = if self.current.kind == TokenKind::Where {
            self.advance()?;
            Some(self.parse_expression()?)
        } else {
            None
        };

        self.expect(TokenKind::Return)?;
        let return_items = self.parse_return_items()?;

        let order_by = if self.current.kind == TokenKind::Order {
            self.advance()?;
            self.expect(TokenKind::By)?;
            self.parse_order_items()?
        } else {
            Vec::new()
        };

        if self.current.kind != TokenKind::Eof {
            return Err(self.error("expected end of query"));
        }

        Ok(Query {
            patterns,
            where_clause,
            return_items,
            order_by,
        })
    }

    fn parse_pattern_list(&mut self) -> Result<Vec<Pattern>> {
        let mut patterns = vec![self.parse_pattern()?];
        while self.current.kind == TokenKind::Comma {
            self.advance()?;
            patterns.push(self.parse_pattern()?);
        }
        Ok(patterns)
    }

    fn parse_pattern(&mut self) -> Result<Pattern> {
        let start = self.parse_node_pattern()?;

        let hop = match self.current.kind {
            TokenKind::Minus => {
                // -[:TYPE]->
                self.advance()?;
                self.expect(TokenKind::LBracket)?;
                self.expect(TokenKind::Colon)?;
                let edge_type = self.expect_identifier()?;
                self.expect(TokenKind::RBracket)?;
                self.expect(TokenKind::Arrow)?;
                let target = self.parse_node_pattern()?;
                Some(Hop {
                    relation: RelPattern {
                        edge_type: edge_type.into(),
                        direction: Direction::Outgoing,
                    },
                    target,
                })
            }
            TokenKind::LeftArrow => {
                // <-[:TYPE]-
                self.advance()?;
                self.expect(TokenKind::LBracket)?;
                self.expect(TokenKind::Colon)?;
                let edge_type = self.expect_identifier()?;
                self.expect(TokenKind::RBracket)?;
                self.expect(TokenKind::Minus)?;
                let target = self.parse_node_pattern()?;
                Some(Hop {
                    relation: RelPattern {
                        edge_type: edge_type.into(),
                        direction: Direction::Incoming,
                    },
                    target,
                })
            }
            _ => None,
        };

        Ok(Pattern { start, hop })
    }

    fn parse_node_pattern(&mut self) -> Result<NodePattern> {
        self.expect(TokenKind::LParen)?;

        let variable = if self.current.kind == TokenKind::Identifier {
            let name = self.current.text.clone();
            self.advance()?;
            Some(name)
        } else {
            None
        };

        let label = if self.current.kind == TokenKind::Colon {
            self.advance()?;
            Some(self.expect_identifier()?.into())
        } else {
            None
        };

        let properties = if self.current.kind == TokenKind::LBrace {
            self.parse_property_map()?
        } else {
            Vec::new()
        };

        self.expect(TokenKind::RParen)?;

        Ok(NodePattern {
            variable,
            label,
            properties,
        })
    }

    fn parse_property_map(&mut self) -> Result<Vec<(quiver_common::types::PropertyKey, Value)>> {
        self.expect(TokenKind::LBrace)?;

        let mut props = Vec::new();
        if self.current.kind != TokenKind::RBrace {
            props.push(self.parse_property_pair()?);
            while self.current.kind == TokenKind::Comma {
                self.advance()?;
                props.push(self.parse_property_pair()?);
            }
        }

        self.expect(TokenKind::RBrace)?;
        Ok(props)
    }

    fn parse_property_pair(&mut self) -> Result<(quiver_common::types::PropertyKey, Value)> {
        let key = self.expect_identifier()?;
        self.expect(TokenKind::Colon)?;
        let value = self.parse_value()?;
        Ok((key.into(), value))
    }

    fn parse_expression(&mut self) -> Result<Expr> {
        // expr := comparison ((AND|OR) comparison)* - one precedence
        // level, left-associative.
        let mut left = self.parse_comparison()?;
        loop {
            let is_and = match self.current.kind {
                TokenKind::And => true,
                TokenKind::Or => false,
                _ => break,
            };
            self.advance()?;
            let right = self.parse_comparison()?;
            left = if is_and {
                Expr::And(Box::new(left), Box::new(right))
            } else {
                Expr::Or(Box::new(left), Box::new(right))
            };
        }
        Ok(left)
    }

    fn parse_comparison(&mut self) -> Result<Expr> {
        let variable = self.expect_identifier()?;
        self.expect(TokenKind::Dot)?;
        let property = self.expect_identifier()?;

        let op = match self.current.kind {
            TokenKind::Eq => CompareOp::Eq,
            TokenKind::Ne => CompareOp::Ne,
            TokenKind::Lt => CompareOp::Lt,
            TokenKind::Le => CompareOp::Le,
            TokenKind::Gt => CompareOp::Gt,
            TokenKind::Ge => CompareOp::Ge,
            _ => return Err(self.error("expected comparison operator")),
        };
        self.advance()?;

        let value = self.parse_value()?;
        Ok(Expr::Comparison {
            variable,
            property,
            op,
            value,
        })
    }

    fn parse_value(&mut self) -> Result<Value> {
        let value = match self.current.kind {
            TokenKind::Null => Value::Null,
            TokenKind::True => Value::Bool(true),
            TokenKind::False => Value::Bool(false),
            TokenKind::Integer => self.parse_integer(&self.current.text.clone(), false)?,
            TokenKind::String => Value::String(self.current.text.as_str().into()),
            TokenKind::Minus => {
                self.advance()?;
                if self.current.kind != TokenKind::Integer {
                    return Err(self.error("expected integer after '-'"));
                }
                self.parse_integer(&self.current.text.clone(), true)?
            }
            _ => return Err(self.error("expected a literal value")),
        };
        self.advance()?;
        Ok(value)
    }

    fn parse_integer(&self, text: &str, negative: bool) -> Result<Value> {
        let magnitude: i64 = text
            .parse()
            .map_err(|_| self.error("integer literal out of range"))?;
        Ok(Value::Int64(if negative { -magnitude } else { magnitude }))
    }

    fn parse_return_items(&mut self) -> Result<Vec<ReturnItem>> {
        let mut items = vec![self.parse_return_item()?];
        while self.current.kind == TokenKind::Comma {
            self.advance()?;
            items.push(self.parse_return_item()?);
        }
        Ok(items)
    }

    fn parse_return_item(&mut self) -> Result<ReturnItem> {
        let variable = self.expect_identifier()?;
        let property = if self.current.kind == TokenKind::Dot {
            self.advance()?;
            Some(self.expect_identifier()?)
        } else {
            None
        };
        Ok(ReturnItem { variable, property })
    }

    fn parse_order_items(&mut self) -> Result<Vec<OrderItem>> {
        let mut items = vec![self.parse_order_item()?];
        while self.current.kind == TokenKind::Comma {
            self.advance()?;
            items.push(self.parse_order_item()?);
        }
        Ok(items)
    }

    fn parse_order_item(&mut self) -> Result<OrderItem> {
        let variable = self.expect_identifier()?;
        self.expect(TokenKind::Dot)?;
        let property = self.expect_identifier()?;
        let descending = match self.current.kind {
            TokenKind::Asc => {
                self.advance()?;
                false
            }
            TokenKind::Desc => {
                self.advance()?;
                true
            }
            _ => false,
        };
        Ok(OrderItem {
            variable,
            property,
            descending,
        })
    }

    // Helper methods
    fn advance(&mut self) -> Result<()> {
        self.current = self.lexer.next_token()?;
        Ok(())
    }

    fn expect(&mut self, kind: TokenKind) -> Result<()> {
        if self.current.kind == kind {
            self.advance()
        } else {
            Err(self.error(&format!("expected {kind:?}")))
        }
    }

    fn expect_identifier(&mut self) -> Result<String> {
        if self.current.kind == TokenKind::Identifier {
            let text = self.current.text.clone();
            self.advance()?;
            Ok(text)
        } else {
            Err(self.error("expected identifier"))
        }
    }

    fn error(&self, message: &str) -> Error {
        QueryError::syntax(format!("{message}, found {:?}", self.current.kind))
            .at(self.current.position)
            .into()
    }
}
