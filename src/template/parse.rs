//! Builds the render tree from lexed segments.

use crate::error::CompileError;

use super::expr::{Expr, Parser};
use super::lexer::{Segment, TagKind};

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Node {
    Text(String),
    Output {
        expr: Expr,
        escape: bool,
    },
    If {
        branches: Vec<(Expr, Vec<Node>)>,
        otherwise: Option<Vec<Node>>,
    },
    For {
        /// Second name of `for (key, value) in ...`; the key or index
        key: Option<String>,
        value: String,
        iterable: Expr,
        body: Vec<Node>,
    },
    Let {
        name: String,
        value: Expr,
    },
    /// Statement evaluated for its side effects only, e.g. `<% include('x') %>`
    Eval(Expr),
}

enum BlockKind {
    Root,
    If {
        done: Vec<(Expr, Vec<Node>)>,
        /// `None` while inside the `else` branch
        cond: Option<Expr>,
    },
    For {
        key: Option<String>,
        value: String,
        iterable: Expr,
    },
}

struct Block {
    kind: BlockKind,
    nodes: Vec<Node>,
    line: usize,
}

impl Block {
    fn new(kind: BlockKind, line: usize) -> Self {
        Self {
            kind,
            nodes: Vec::new(),
            line,
        }
    }
}

pub(crate) fn parse(segments: Vec<Segment<'_>>) -> Result<Vec<Node>, CompileError> {
    let mut stack = vec![Block::new(BlockKind::Root, 1)];

    for segment in segments {
        match segment {
            Segment::Text(text) => push(&mut stack, Node::Text(text.to_string())),
            Segment::Tag { kind, body, line } => match kind {
                TagKind::Comment => {}
                TagKind::Escaped | TagKind::Raw => {
                    let mut parser = Parser::new(body, line)?;
                    let expr = parser.parse_expr()?;
                    parser.finish()?;
                    push(
                        &mut stack,
                        Node::Output {
                            expr,
                            escape: kind == TagKind::Escaped,
                        },
                    );
                }
                TagKind::Code => statement(&mut stack, body, line)?,
            },
        }
    }

    let block = pop(&mut stack);
    match block.kind {
        BlockKind::Root => Ok(block.nodes),
        _ => Err(CompileError::new(
            block.line,
            "block is never closed, expected '<% } %>'",
        )),
    }
}

fn statement(stack: &mut Vec<Block>, body: &str, line: usize) -> Result<(), CompileError> {
    let mut parser = Parser::new(body, line)?;
    if parser.is_at_end() {
        return Ok(());
    }

    if parser.eat_punct("}") {
        return close_block(stack, &mut parser, line);
    }

    if parser.eat_keyword("if") {
        let cond = parser.parse_expr()?;
        parser.expect_punct("{")?;
        parser.finish()?;
        stack.push(Block::new(
            BlockKind::If {
                done: Vec::new(),
                cond: Some(cond),
            },
            line,
        ));
        return Ok(());
    }

    if parser.eat_keyword("for") {
        let (key, value) = if parser.eat_punct("(") {
            let key = parser.expect_ident()?;
            parser.expect_punct(",")?;
            let value = parser.expect_ident()?;
            parser.expect_punct(")")?;
            (Some(key), value)
        } else {
            (None, parser.expect_ident()?)
        };
        if !parser.eat_keyword("in") {
            return Err(parser.error("expected 'in' in for loop"));
        }
        let iterable = parser.parse_expr()?;
        parser.expect_punct("{")?;
        parser.finish()?;
        stack.push(Block::new(
            BlockKind::For {
                key,
                value,
                iterable,
            },
            line,
        ));
        return Ok(());
    }

    if parser.eat_keyword("let") {
        let name = parser.expect_ident()?;
        parser.expect_punct("=")?;
        let value = parser.parse_expr()?;
        parser.finish()?;
        push(stack, Node::Let { name, value });
        return Ok(());
    }

    let expr = parser.parse_expr()?;
    parser.finish()?;
    push(stack, Node::Eval(expr));
    Ok(())
}

/// Handles `}`, `} else {` and `} else if cond {`
fn close_block(stack: &mut Vec<Block>, parser: &mut Parser, line: usize) -> Result<(), CompileError> {
    if stack.len() == 1 {
        return Err(parser.error("unmatched '}'"));
    }
    let block = pop(stack);

    if parser.eat_keyword("else") {
        let BlockKind::If {
            mut done,
            cond: Some(cond),
        } = block.kind
        else {
            return Err(parser.error("'else' without a matching 'if'"));
        };
        done.push((cond, block.nodes));

        let next = if parser.eat_keyword("if") {
            Some(parser.parse_expr()?)
        } else {
            None
        };
        parser.expect_punct("{")?;
        parser.finish()?;
        stack.push(Block::new(BlockKind::If { done, cond: next }, line));
        return Ok(());
    }

    parser.finish()?;
    let node = match block.kind {
        BlockKind::If {
            mut done,
            cond: Some(cond),
        } => {
            done.push((cond, block.nodes));
            Node::If {
                branches: done,
                otherwise: None,
            }
        }
        BlockKind::If { done, cond: None } => Node::If {
            branches: done,
            otherwise: Some(block.nodes),
        },
        BlockKind::For {
            key,
            value,
            iterable,
        } => Node::For {
            key,
            value,
            iterable,
            body: block.nodes,
        },
        BlockKind::Root => return Err(parser.error("unmatched '}'")),
    };
    push(stack, node);
    Ok(())
}

fn push(stack: &mut [Block], node: Node) {
    if let Some(block) = stack.last_mut() {
        block.nodes.push(node);
    }
}

fn pop(stack: &mut Vec<Block>) -> Block {
    stack
        .pop()
        .unwrap_or_else(|| Block::new(BlockKind::Root, 1))
}

#[cfg(test)]
mod tests {
    use super::super::lexer::split;
    use super::*;

    fn compile(src: &str) -> Result<Vec<Node>, CompileError> {
        parse(split(src)?)
    }

    #[test]
    fn test_text_and_output() {
        let nodes = compile("<h1><%= name %></h1>").unwrap();
        assert_eq!(nodes.len(), 3);
        assert!(matches!(&nodes[1], Node::Output { escape: true, .. }));
    }

    #[test]
    fn test_if_else_chain() {
        let nodes = compile("<% if a { %>A<% } else if b { %>B<% } else { %>C<% } %>").unwrap();
        let [Node::If { branches, otherwise }] = nodes.as_slice() else {
            panic!("expected a single if node, got {:?}", nodes);
        };
        assert_eq!(branches.len(), 2);
        assert_eq!(otherwise.as_deref(), Some(&[Node::Text("C".into())][..]));
    }

    #[test]
    fn test_for_with_key() {
        let nodes = compile("<% for (i, post) in posts { %><%= post %><% } %>").unwrap();
        let [Node::For { key, value, body, .. }] = nodes.as_slice() else {
            panic!("expected a single for node, got {:?}", nodes);
        };
        assert_eq!(key.as_deref(), Some("i"));
        assert_eq!(value, "post");
        assert_eq!(body.len(), 1);
    }

    #[test]
    fn test_comments_emit_nothing() {
        let nodes = compile("a<%# hidden <b> %>b").unwrap();
        assert_eq!(nodes, vec![Node::Text("a".into()), Node::Text("b".into())]);
    }

    #[test]
    fn test_unclosed_block_reports_opening_line() {
        let err = compile("\n\n<% if a { %>never closed").unwrap_err();
        assert_eq!(err.line, 3);
    }

    #[test]
    fn test_unmatched_close() {
        assert!(compile("<% } %>").is_err());
    }

    #[test]
    fn test_else_after_for_is_rejected() {
        assert!(compile("<% for x in xs { %><% } else { %><% } %>").is_err());
    }

    #[test]
    fn test_double_else_is_rejected() {
        assert!(compile("<% if a { %><% } else { %><% } else { %><% } %>").is_err());
    }
}
