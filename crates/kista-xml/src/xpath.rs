#![forbid(unsafe_code)]

//! Restricted XPath support for XML-DSig processing.
//!
//! Only boolean predicates of the shape used by XPath transforms are
//! understood:
//!
//! - `not(e)`, `e and e`, `e or e`, parentheses, `true()`, `false()`
//! - location steps on the `self`, `parent`, `ancestor` and
//!   `ancestor-or-self` axes with a name test (`*`, `name`, `p:name`) or a
//!   node-type test (`node()`, `text()`, `comment()`,
//!   `processing-instruction()`)
//!
//! A step is true when it selects at least one node. Anything else is
//! rejected with [`Error::InvalidArgument`] at compile time.

use crate::nodeset::NodeSet;
use kista_core::Error;
use roxmltree::Node;
use std::collections::HashMap;

/// Parse a same-document reference (e.g., `#foo` → `foo`).
pub fn parse_same_document_ref(uri: &str) -> Option<&str> {
    uri.strip_prefix('#')
}

/// Check if `ancestor` is an ancestor-or-self of `node`.
pub fn is_ancestor_or_self(ancestor: Node<'_, '_>, node: Node<'_, '_>) -> bool {
    node.ancestors().any(|n| n.id() == ancestor.id())
}

/// A compiled boolean XPath expression.
#[derive(Debug, Clone, PartialEq)]
pub struct Predicate {
    expr: Expr,
}

#[derive(Debug, Clone, PartialEq)]
enum Expr {
    Const(bool),
    Not(Box<Expr>),
    And(Box<Expr>, Box<Expr>),
    Or(Box<Expr>, Box<Expr>),
    Step(Axis, NodeTest),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Axis {
    SelfAxis,
    Parent,
    Ancestor,
    AncestorOrSelf,
}

#[derive(Debug, Clone, PartialEq)]
enum NodeTest {
    AnyElement,
    Name { ns: Option<String>, local: String },
    AnyNode,
    Text,
    Comment,
    ProcessingInstruction,
}

impl Predicate {
    /// Compile `expression`, resolving prefixes against `namespaces`.
    pub fn compile(expression: &str, namespaces: &HashMap<String, String>) -> Result<Self, Error> {
        let tokens = tokenize(expression)?;
        let mut parser = Parser {
            tokens,
            pos: 0,
            namespaces,
        };
        let expr = parser.parse_or()?;
        if parser.pos != parser.tokens.len() {
            return Err(unsupported(expression));
        }
        Ok(Self { expr })
    }

    /// Evaluate the predicate with `node` as the context node.
    pub fn matches(&self, node: Node<'_, '_>) -> bool {
        eval(&self.expr, node)
    }

    /// `(.//. | .//@* | .//namespace::*)[expr]` relative to `apex`.
    pub fn select(&self, apex: Node<'_, '_>) -> NodeSet {
        NodeSet::filtered(apex, |n| self.matches(n))
    }
}

fn eval(expr: &Expr, node: Node<'_, '_>) -> bool {
    match expr {
        Expr::Const(b) => *b,
        Expr::Not(inner) => !eval(inner, node),
        Expr::And(a, b) => eval(a, node) && eval(b, node),
        Expr::Or(a, b) => eval(a, node) || eval(b, node),
        Expr::Step(axis, test) => match axis {
            Axis::SelfAxis => test.matches(node),
            Axis::Parent => node.parent().is_some_and(|p| test.matches(p)),
            Axis::Ancestor => node.ancestors().skip(1).any(|n| test.matches(n)),
            Axis::AncestorOrSelf => node.ancestors().any(|n| test.matches(n)),
        },
    }
}

impl NodeTest {
    fn matches(&self, node: Node<'_, '_>) -> bool {
        match self {
            NodeTest::AnyElement => node.is_element(),
            NodeTest::Name { ns, local } => {
                node.is_element()
                    && node.tag_name().name() == local
                    && node.tag_name().namespace() == ns.as_deref()
            }
            NodeTest::AnyNode => true,
            NodeTest::Text => node.is_text(),
            NodeTest::Comment => node.is_comment(),
            NodeTest::ProcessingInstruction => node.is_pi(),
        }
    }
}

fn unsupported(expression: &str) -> Error {
    Error::InvalidArgument(format!("unsupported XPath expression: {expression}"))
}

// ── Tokenizer ────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
enum Token {
    LParen,
    RParen,
    Axis(String),
    Name(String),
    Star,
}

fn tokenize(expression: &str) -> Result<Vec<Token>, Error> {
    let mut tokens = Vec::new();
    let mut chars = expression.char_indices().peekable();
    while let Some(&(i, c)) = chars.peek() {
        if c.is_whitespace() {
            chars.next();
        } else if c == '(' {
            tokens.push(Token::LParen);
            chars.next();
        } else if c == ')' {
            tokens.push(Token::RParen);
            chars.next();
        } else if c == '*' {
            tokens.push(Token::Star);
            chars.next();
        } else if c.is_alphabetic() || c == '_' {
            let mut end = i;
            while let Some(&(j, d)) = chars.peek() {
                if d.is_alphanumeric() || matches!(d, '_' | '-' | '.') {
                    end = j + d.len_utf8();
                    chars.next();
                } else if d == ':' {
                    // `axis::` or `prefix:local`
                    let rest = &expression[j..];
                    if rest.starts_with("::") {
                        break;
                    }
                    end = j + 1;
                    chars.next();
                } else {
                    break;
                }
            }
            let word = &expression[i..end];
            if expression[end..].starts_with("::") {
                chars.next();
                chars.next();
                tokens.push(Token::Axis(word.to_owned()));
            } else {
                tokens.push(Token::Name(word.to_owned()));
            }
        } else {
            return Err(unsupported(expression));
        }
    }
    Ok(tokens)
}

// ── Parser ───────────────────────────────────────────────────────────

struct Parser<'n> {
    tokens: Vec<Token>,
    pos: usize,
    namespaces: &'n HashMap<String, String>,
}

impl Parser<'_> {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Token> {
        let t = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        t
    }

    fn expect(&mut self, token: Token) -> Result<(), Error> {
        match self.next() {
            Some(t) if t == token => Ok(()),
            other => Err(Error::InvalidArgument(format!(
                "XPath: expected {token:?}, found {other:?}"
            ))),
        }
    }

    fn keyword(&mut self, word: &str) -> bool {
        if matches!(self.peek(), Some(Token::Name(n)) if n == word) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn parse_or(&mut self) -> Result<Expr, Error> {
        let mut lhs = self.parse_and()?;
        while self.keyword("or") {
            let rhs = self.parse_and()?;
            lhs = Expr::Or(Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn parse_and(&mut self) -> Result<Expr, Error> {
        let mut lhs = self.parse_unary()?;
        while self.keyword("and") {
            let rhs = self.parse_unary()?;
            lhs = Expr::And(Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn parse_unary(&mut self) -> Result<Expr, Error> {
        match self.next() {
            Some(Token::LParen) => {
                let inner = self.parse_or()?;
                self.expect(Token::RParen)?;
                Ok(inner)
            }
            Some(Token::Name(name)) => match name.as_str() {
                "not" => {
                    self.expect(Token::LParen)?;
                    let inner = self.parse_or()?;
                    self.expect(Token::RParen)?;
                    Ok(Expr::Not(Box::new(inner)))
                }
                "true" | "false" => {
                    self.expect(Token::LParen)?;
                    self.expect(Token::RParen)?;
                    Ok(Expr::Const(name == "true"))
                }
                other => Err(Error::InvalidArgument(format!(
                    "XPath: unsupported function or abbreviated step `{other}`"
                ))),
            },
            Some(Token::Axis(axis)) => {
                let axis = match axis.as_str() {
                    "self" => Axis::SelfAxis,
                    "parent" => Axis::Parent,
                    "ancestor" => Axis::Ancestor,
                    "ancestor-or-self" => Axis::AncestorOrSelf,
                    other => {
                        return Err(Error::InvalidArgument(format!(
                            "XPath: unsupported axis `{other}`"
                        )))
                    }
                };
                let test = self.parse_node_test()?;
                Ok(Expr::Step(axis, test))
            }
            other => Err(Error::InvalidArgument(format!(
                "XPath: unexpected token {other:?}"
            ))),
        }
    }

    fn parse_node_test(&mut self) -> Result<NodeTest, Error> {
        match self.next() {
            Some(Token::Star) => Ok(NodeTest::AnyElement),
            Some(Token::Name(name)) => {
                let kind_test = match name.as_str() {
                    "node" => Some(NodeTest::AnyNode),
                    "text" => Some(NodeTest::Text),
                    "comment" => Some(NodeTest::Comment),
                    "processing-instruction" => Some(NodeTest::ProcessingInstruction),
                    _ => None,
                };
                if let Some(test) = kind_test {
                    if self.peek() == Some(&Token::LParen) {
                        self.pos += 1;
                        self.expect(Token::RParen)?;
                        return Ok(test);
                    }
                }
                match name.split_once(':') {
                    Some((prefix, local)) => {
                        let ns = self.namespaces.get(prefix).ok_or_else(|| {
                            Error::InvalidArgument(format!("XPath: unbound prefix `{prefix}`"))
                        })?;
                        Ok(NodeTest::Name {
                            ns: Some(ns.clone()),
                            local: local.to_owned(),
                        })
                    }
                    None => Ok(NodeTest::Name {
                        ns: None,
                        local: name,
                    }),
                }
            }
            other => Err(Error::InvalidArgument(format!(
                "XPath: expected node test, found {other:?}"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DSIG: &str = "http://www.w3.org/2000/09/xmldsig#";

    fn ds() -> HashMap<String, String> {
        HashMap::from([("dsig".to_owned(), DSIG.to_owned())])
    }

    #[test]
    fn test_same_document_ref() {
        assert_eq!(parse_same_document_ref("#abc"), Some("abc"));
        assert_eq!(parse_same_document_ref("abc"), None);
    }

    #[test]
    fn test_enveloped_expression() {
        let xml = format!(
            r#"<doc><data>x</data><ds:Signature xmlns:ds="{DSIG}"><ds:SignedInfo/></ds:Signature></doc>"#
        );
        let doc = crate::parse(&xml).unwrap();
        let pred = Predicate::compile("not(ancestor-or-self::dsig:Signature)", &ds()).unwrap();
        let set = pred.select(doc.root());
        let data = doc.descendants().find(|n| n.has_tag_name("data")).unwrap();
        let signed_info = doc.descendants().find(|n| n.has_tag_name((DSIG, "SignedInfo"))).unwrap();
        assert!(set.contains(&data));
        assert!(set.contains(&data.first_child().unwrap()));
        assert!(!set.contains(&signed_info));
    }

    #[test]
    fn test_boolean_combinators() {
        let doc = crate::parse("<a><b><!--c-->t</b></a>").unwrap();
        let pred = Predicate::compile(
            "self::text() or (ancestor::b and not(self::comment()))",
            &HashMap::new(),
        )
        .unwrap();
        let comment = doc.descendants().find(|n| n.is_comment()).unwrap();
        let text = doc.descendants().find(|n| n.is_text()).unwrap();
        assert!(pred.matches(text));
        assert!(!pred.matches(comment));
        assert!(!pred.matches(doc.root_element()));
    }

    #[test]
    fn test_unsupported_expressions() {
        for expr in [
            "count(ancestor::a) > 0",
            "following::a",
            "ancestor-or-self::x:Foo",
            "here()",
            "@Id",
        ] {
            let err = Predicate::compile(expr, &HashMap::new()).unwrap_err();
            assert!(matches!(err, Error::InvalidArgument(_)), "{expr}");
        }
    }
}
