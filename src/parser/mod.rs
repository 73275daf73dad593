//=====================================================
// File: parser.rs
//=====================================================
// Author: Vesper Contributors
// License: MIT License
// Goal: VesperScript recursive descent parser
// Objective: Transform token streams into the AST consumed by the resolver
//            and interpreter, collecting every independent syntax error
//=====================================================

//=====================================================
//            Section 1: Parse Errors
//=====================================================

use crate::ast::{
    next_node_id, BinaryOp, CatchClause, ClassDecl, Expr, FromImportDecl, FunctionDecl,
    ImportDecl, InterfaceDecl, Literal, LogicalOp, MethodSignature, Program, PropertyDecl, Stmt,
    TypeHint, UnaryOp, VariableDecl,
};
use crate::diagnostics::{DiagnosticKind, Diagnostics};
use crate::source::Position;
use crate::symbol::Symbol;
use crate::tokenizer::{Token, TokenKind};

#[derive(Debug, Clone)]
pub enum ParseError {
    UnexpectedToken {
        expected: String,
        found: TokenKind,
        position: Position,
    },
    UnexpectedEndOfInput {
        expected: String,
        position: Position,
    },
    InvalidSyntax {
        message: String,
        position: Position,
    },
}

impl ParseError {
    pub fn position(&self) -> &Position {
        match self {
            ParseError::UnexpectedToken { position, .. }
            | ParseError::UnexpectedEndOfInput { position, .. }
            | ParseError::InvalidSyntax { position, .. } => position,
        }
    }
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParseError::UnexpectedToken {
                expected,
                found,
                position,
            } => write!(
                f,
                "Expected {} but found {:?} at line {}, column {}",
                expected, found, position.line, position.column
            ),
            ParseError::UnexpectedEndOfInput { expected, position } => write!(
                f,
                "Unexpected end of input, expected {} at line {}, column {}",
                expected, position.line, position.column
            ),
            ParseError::InvalidSyntax { message, position } => write!(
                f,
                "Invalid syntax: {} at line {}, column {}",
                message, position.line, position.column
            ),
        }
    }
}

impl std::error::Error for ParseError {}

//=====================================================
//            Section 2: Parser State
//=====================================================

/// Recursive descent parser. A malformed construct is recorded and the
/// parser resynchronizes at the next statement boundary, so one pass
/// surfaces every independent error.
pub struct Parser {
    tokens: Vec<Token>,
    current: usize,
    errors: Vec<ParseError>,
}

impl Parser {
    pub fn new(tokens: Vec<Token>) -> Self {
        // Whitespace and comments carry no structure; newlines stay in
        // the stream because they terminate statements.
        let mut tokens: Vec<Token> = tokens
            .into_iter()
            .filter(|token| !matches!(token.kind, TokenKind::Whitespace | TokenKind::Comment))
            .collect();
        if tokens.is_empty() {
            tokens.push(Token {
                kind: TokenKind::Eof,
                lexeme: String::new(),
                position: Position::new(1, 1, std::rc::Rc::from("")),
            });
        }
        Self {
            tokens,
            current: 0,
            errors: Vec::new(),
        }
    }

    pub fn errors(&self) -> &[ParseError] {
        &self.errors
    }

    pub fn report_errors(&self, diagnostics: &mut Diagnostics) {
        for error in &self.errors {
            diagnostics.report(
                DiagnosticKind::Syntax,
                error.to_string(),
                Some(error.position().clone()),
            );
        }
    }

    /// Parse a complete program. Callers must check `errors()` before
    /// handing the result to the resolver.
    pub fn parse(&mut self) -> Program {
        let position = self.current_position();
        let mut statements = Vec::new();
        loop {
            self.skip_separators();
            if self.is_at_end() {
                break;
            }
            match self.parse_statement() {
                Ok(stmt) => statements.push(stmt),
                Err(error) => {
                    self.errors.push(error);
                    self.synchronize();
                }
            }
        }
        Program::new(statements, position)
    }

    //=====================================================
    //            Section 3: Token Navigation
    //=====================================================

    fn peek(&self) -> &Token {
        &self.tokens[self.current.min(self.tokens.len() - 1)]
    }

    fn peek_nth(&self, n: usize) -> &Token {
        let index = (self.current + n).min(self.tokens.len() - 1);
        &self.tokens[index]
    }

    fn advance(&mut self) -> Token {
        let token = self.peek().clone();
        if self.current < self.tokens.len() - 1 {
            self.current += 1;
        }
        token
    }

    fn check(&self, kind: &TokenKind) -> bool {
        &self.peek().kind == kind
    }

    fn is_at_end(&self) -> bool {
        matches!(self.peek().kind, TokenKind::Eof)
    }

    fn current_position(&self) -> Position {
        self.peek().position.clone()
    }

    fn consume(&mut self, kind: &TokenKind, expected: &str) -> Result<Token, ParseError> {
        if self.check(kind) {
            Ok(self.advance())
        } else if self.is_at_end() {
            Err(ParseError::UnexpectedEndOfInput {
                expected: expected.to_string(),
                position: self.current_position(),
            })
        } else {
            Err(ParseError::UnexpectedToken {
                expected: expected.to_string(),
                found: self.peek().kind.clone(),
                position: self.current_position(),
            })
        }
    }

    fn consume_identifier(&mut self, expected: &str) -> Result<Symbol, ParseError> {
        match &self.peek().kind {
            TokenKind::Identifier(name) => {
                let name = name.clone();
                self.advance();
                Ok(name)
            }
            _ => Err(ParseError::UnexpectedToken {
                expected: expected.to_string(),
                found: self.peek().kind.clone(),
                position: self.current_position(),
            }),
        }
    }

    fn skip_newlines(&mut self) {
        while matches!(self.peek().kind, TokenKind::Newline) {
            self.advance();
        }
    }

    fn skip_separators(&mut self) {
        while matches!(self.peek().kind, TokenKind::Newline | TokenKind::Semicolon) {
            self.advance();
        }
    }

    fn consume_terminator(&mut self) -> Result<(), ParseError> {
        match self.peek().kind {
            TokenKind::Newline | TokenKind::Semicolon => {
                self.advance();
                Ok(())
            }
            TokenKind::RightBrace | TokenKind::Eof => Ok(()),
            _ => Err(ParseError::UnexpectedToken {
                expected: "end of statement".to_string(),
                found: self.peek().kind.clone(),
                position: self.current_position(),
            }),
        }
    }

    /// Panic-mode recovery: always step past the offending token, then
    /// skip to the next statement boundary.
    fn synchronize(&mut self) {
        if self.is_at_end() {
            return;
        }
        self.advance();
        while !self.is_at_end() {
            match self.peek().kind {
                TokenKind::Newline | TokenKind::Semicolon => {
                    self.advance();
                    return;
                }
                TokenKind::RightBrace
                | TokenKind::Var
                | TokenKind::Const
                | TokenKind::Func
                | TokenKind::Async
                | TokenKind::Class
                | TokenKind::Interface
                | TokenKind::If
                | TokenKind::While
                | TokenKind::For
                | TokenKind::Return
                | TokenKind::Import
                | TokenKind::From
                | TokenKind::Try
                | TokenKind::Throw
                | TokenKind::Print => return,
                _ => {
                    self.advance();
                }
            }
        }
    }

    //=====================================================
    //            Section 4: Statements
    //=====================================================

    fn parse_statement(&mut self) -> Result<Stmt, ParseError> {
        match &self.peek().kind {
            TokenKind::Var => self.parse_variable_declaration(true),
            TokenKind::Const => self.parse_variable_declaration(false),
            TokenKind::Func => self.parse_function_declaration(false),
            TokenKind::Async => {
                self.advance();
                self.parse_function_declaration(true)
            }
            TokenKind::New => self.parse_new_statement(),
            TokenKind::Print => self.parse_print_statement(),
            TokenKind::Return => self.parse_return_statement(),
            TokenKind::Class => self.parse_class_declaration(),
            TokenKind::Interface => self.parse_interface_declaration(),
            TokenKind::Import => self.parse_import(),
            TokenKind::From => self.parse_from_import(),
            TokenKind::Package => self.parse_package(),
            TokenKind::Throw => self.parse_throw(),
            TokenKind::Try => self.parse_try(),
            TokenKind::If => self.parse_if(),
            TokenKind::While => self.parse_while(),
            TokenKind::For => self.parse_for(),
            TokenKind::Break => {
                let position = self.current_position();
                self.advance();
                self.consume_terminator()?;
                Ok(Stmt::Break { position })
            }
            TokenKind::Continue => {
                let position = self.current_position();
                self.advance();
                self.consume_terminator()?;
                Ok(Stmt::Continue { position })
            }
            TokenKind::LeftBrace => self.parse_block(),
            _ => self.parse_expression_statement(),
        }
    }

    fn parse_variable_declaration(&mut self, mutable: bool) -> Result<Stmt, ParseError> {
        let position = self.current_position();
        self.advance(); // var / const
        let name = self.consume_identifier("variable name")?;
        let hint = if self.check(&TokenKind::Colon) {
            self.advance();
            self.parse_type_hint()?
        } else {
            TypeHint::Dynamic
        };
        let initializer = if self.check(&TokenKind::Equal) {
            self.advance();
            Some(self.parse_expression()?)
        } else if !mutable {
            return Err(ParseError::InvalidSyntax {
                message: "const bindings require an initializer".to_string(),
                position: self.current_position(),
            });
        } else {
            None
        };
        self.consume_terminator()?;
        Ok(Stmt::VarDecl {
            decl: VariableDecl {
                name,
                hint,
                initializer,
                mutable,
                position,
                node_id: next_node_id(),
            },
        })
    }

    fn parse_function_declaration(&mut self, is_async: bool) -> Result<Stmt, ParseError> {
        let position = self.current_position();
        self.consume(&TokenKind::Func, "'func'")?;
        let name = self.consume_identifier("function name")?;
        let params = self.parse_parameter_list()?;
        let body = self.parse_brace_body()?;
        Ok(Stmt::FuncDecl {
            decl: FunctionDecl {
                name,
                params,
                body,
                is_async,
                position,
                node_id: next_node_id(),
            },
        })
    }

    fn parse_parameter_list(&mut self) -> Result<Vec<Expr>, ParseError> {
        self.consume(&TokenKind::LeftParen, "'(' before parameters")?;
        self.skip_newlines();
        let mut params = Vec::new();
        if !self.check(&TokenKind::RightParen) {
            loop {
                let position = self.current_position();
                let name = self.consume_identifier("parameter name")?;
                let hint = if self.check(&TokenKind::Colon) {
                    self.advance();
                    let hint_position = self.current_position();
                    let hint = self.parse_type_hint()?;
                    Some(Box::new(Expr::TypeHint {
                        hint,
                        position: hint_position,
                    }))
                } else {
                    None
                };
                params.push(Expr::Parameter {
                    name,
                    hint,
                    position,
                    node_id: next_node_id(),
                });
                self.skip_newlines();
                if !self.check(&TokenKind::Comma) {
                    break;
                }
                self.advance();
                self.skip_newlines();
            }
        }
        self.consume(&TokenKind::RightParen, "')' after parameters")?;
        Ok(params)
    }

    /// `{ statements }` returned as a flat list, for function and
    /// method bodies.
    fn parse_brace_body(&mut self) -> Result<Vec<Stmt>, ParseError> {
        self.skip_newlines();
        self.consume(&TokenKind::LeftBrace, "'{' before body")?;
        let mut statements = Vec::new();
        loop {
            self.skip_separators();
            if self.check(&TokenKind::RightBrace) || self.is_at_end() {
                break;
            }
            match self.parse_statement() {
                Ok(stmt) => statements.push(stmt),
                Err(error) => {
                    self.errors.push(error);
                    self.synchronize();
                }
            }
        }
        self.consume(&TokenKind::RightBrace, "'}' after body")?;
        Ok(statements)
    }

    fn parse_block(&mut self) -> Result<Stmt, ParseError> {
        let position = self.current_position();
        let statements = self.parse_brace_body()?;
        Ok(Stmt::Block {
            statements,
            position,
        })
    }

    fn parse_new_statement(&mut self) -> Result<Stmt, ParseError> {
        // `new name = Class(args)` is the instantiation statement;
        // anything else after `new` is the expression form.
        if matches!(self.peek_nth(1).kind, TokenKind::Identifier(_))
            && matches!(self.peek_nth(2).kind, TokenKind::Equal)
        {
            let position = self.current_position();
            self.advance(); // new
            let name = self.consume_identifier("instance name")?;
            self.consume(&TokenKind::Equal, "'=' in instantiation")?;
            let class = self.consume_identifier("class name")?;
            let args = self.parse_argument_list()?;
            self.consume_terminator()?;
            Ok(Stmt::Instantiate {
                name,
                class,
                args,
                position,
                name_node_id: next_node_id(),
                class_node_id: next_node_id(),
            })
        } else {
            self.parse_expression_statement()
        }
    }

    fn parse_print_statement(&mut self) -> Result<Stmt, ParseError> {
        let position = self.current_position();
        self.advance();
        let expr = self.parse_expression()?;
        self.consume_terminator()?;
        Ok(Stmt::Print { expr, position })
    }

    fn parse_return_statement(&mut self) -> Result<Stmt, ParseError> {
        let position = self.current_position();
        self.advance();
        let value = if matches!(
            self.peek().kind,
            TokenKind::Newline | TokenKind::Semicolon | TokenKind::RightBrace | TokenKind::Eof
        ) {
            None
        } else {
            Some(self.parse_expression()?)
        };
        self.consume_terminator()?;
        Ok(Stmt::Return { value, position })
    }

    fn parse_class_declaration(&mut self) -> Result<Stmt, ParseError> {
        let position = self.current_position();
        self.advance(); // class
        let name = self.consume_identifier("class name")?;
        let mut interfaces = Vec::new();
        if self.check(&TokenKind::Implements) {
            self.advance();
            loop {
                interfaces.push(self.consume_identifier("interface name")?);
                if !self.check(&TokenKind::Comma) {
                    break;
                }
                self.advance();
            }
        }
        self.skip_newlines();
        self.consume(&TokenKind::LeftBrace, "'{' before class body")?;
        let mut members = Vec::new();
        loop {
            self.skip_separators();
            if self.check(&TokenKind::RightBrace) || self.is_at_end() {
                break;
            }
            let member = match self.peek().kind {
                TokenKind::Var => self.parse_property_declaration(true),
                TokenKind::Const => self.parse_property_declaration(false),
                TokenKind::Abstract => self.parse_abstract_method(),
                TokenKind::Func => self.parse_method(false),
                TokenKind::Async => {
                    self.advance();
                    self.parse_method(true)
                }
                _ => Err(ParseError::UnexpectedToken {
                    expected: "class member".to_string(),
                    found: self.peek().kind.clone(),
                    position: self.current_position(),
                }),
            };
            match member {
                Ok(stmt) => members.push(stmt),
                Err(error) => {
                    self.errors.push(error);
                    self.synchronize();
                }
            }
        }
        self.consume(&TokenKind::RightBrace, "'}' after class body")?;
        Ok(Stmt::ClassDecl {
            decl: ClassDecl {
                name,
                interfaces,
                members,
                position,
                node_id: next_node_id(),
            },
        })
    }

    fn parse_property_declaration(&mut self, mutable: bool) -> Result<Stmt, ParseError> {
        let position = self.current_position();
        self.advance(); // var / const
        let name = self.consume_identifier("property name")?;
        let hint = if self.check(&TokenKind::Colon) {
            self.advance();
            self.parse_type_hint()?
        } else {
            TypeHint::Dynamic
        };
        let initializer = if self.check(&TokenKind::Equal) {
            self.advance();
            Some(self.parse_expression()?)
        } else {
            None
        };
        self.consume_terminator()?;
        Ok(Stmt::PropertyDecl {
            decl: PropertyDecl {
                name,
                hint,
                initializer,
                mutable,
                position,
                node_id: next_node_id(),
            },
        })
    }

    fn parse_method(&mut self, is_async: bool) -> Result<Stmt, ParseError> {
        let position = self.current_position();
        self.consume(&TokenKind::Func, "'func'")?;
        let name = self.consume_identifier("method name")?;
        let params = self.parse_parameter_list()?;
        let body = self.parse_brace_body()?;
        Ok(Stmt::MethodDecl {
            decl: FunctionDecl {
                name,
                params,
                body,
                is_async,
                position,
                node_id: next_node_id(),
            },
        })
    }

    fn parse_abstract_method(&mut self) -> Result<Stmt, ParseError> {
        let signature = self.parse_method_signature()?;
        Ok(Stmt::AbstractMethodDecl { decl: signature })
    }

    fn parse_method_signature(&mut self) -> Result<MethodSignature, ParseError> {
        let position = self.current_position();
        if self.check(&TokenKind::Abstract) {
            self.advance();
        }
        let is_async = if self.check(&TokenKind::Async) {
            self.advance();
            true
        } else {
            false
        };
        self.consume(&TokenKind::Func, "'func'")?;
        let name = self.consume_identifier("method name")?;
        let params = self.parse_parameter_list()?;
        self.consume_terminator()?;
        Ok(MethodSignature {
            name,
            params,
            is_async,
            position,
        })
    }

    fn parse_interface_declaration(&mut self) -> Result<Stmt, ParseError> {
        let position = self.current_position();
        self.advance(); // interface
        let name = self.consume_identifier("interface name")?;
        self.skip_newlines();
        self.consume(&TokenKind::LeftBrace, "'{' before interface body")?;
        let mut methods = Vec::new();
        loop {
            self.skip_separators();
            if self.check(&TokenKind::RightBrace) || self.is_at_end() {
                break;
            }
            match self.parse_method_signature() {
                Ok(signature) => methods.push(signature),
                Err(error) => {
                    self.errors.push(error);
                    self.synchronize();
                }
            }
        }
        self.consume(&TokenKind::RightBrace, "'}' after interface body")?;
        Ok(Stmt::InterfaceDecl {
            decl: InterfaceDecl {
                name,
                methods,
                position,
                node_id: next_node_id(),
            },
        })
    }

    fn parse_import(&mut self) -> Result<Stmt, ParseError> {
        let position = self.current_position();
        self.advance(); // import
        let path = self.consume_module_path()?;
        let alias = if self.check(&TokenKind::As) {
            self.advance();
            Some(self.consume_identifier("module alias")?)
        } else {
            None
        };
        self.consume_terminator()?;
        Ok(Stmt::Import {
            decl: ImportDecl {
                path,
                alias,
                position,
                node_id: next_node_id(),
            },
        })
    }

    fn parse_from_import(&mut self) -> Result<Stmt, ParseError> {
        let position = self.current_position();
        self.advance(); // from
        let path = self.consume_module_path()?;
        self.consume(&TokenKind::Import, "'import' after module path")?;
        let mut names = Vec::new();
        loop {
            let name = self.consume_identifier("imported name")?;
            names.push((name, next_node_id()));
            if !self.check(&TokenKind::Comma) {
                break;
            }
            self.advance();
        }
        self.consume_terminator()?;
        Ok(Stmt::FromImport {
            decl: FromImportDecl {
                path,
                names,
                position,
            },
        })
    }

    fn consume_module_path(&mut self) -> Result<String, ParseError> {
        match &self.peek().kind {
            TokenKind::StringLiteral(path) => {
                let path = path.clone();
                self.advance();
                Ok(path)
            }
            _ => Err(ParseError::UnexpectedToken {
                expected: "module path string".to_string(),
                found: self.peek().kind.clone(),
                position: self.current_position(),
            }),
        }
    }

    fn parse_package(&mut self) -> Result<Stmt, ParseError> {
        let position = self.current_position();
        self.advance(); // package
        let name = self.consume_identifier("package name")?;
        self.consume_terminator()?;
        Ok(Stmt::Package { name, position })
    }

    fn parse_throw(&mut self) -> Result<Stmt, ParseError> {
        let position = self.current_position();
        self.advance();
        let expr = self.parse_expression()?;
        self.consume_terminator()?;
        Ok(Stmt::Throw { expr, position })
    }

    fn parse_try(&mut self) -> Result<Stmt, ParseError> {
        let position = self.current_position();
        self.advance(); // try
        let body = Box::new(self.parse_block_after_keyword()?);
        self.skip_newlines();
        let catch = if self.check(&TokenKind::Catch) {
            let catch_position = self.current_position();
            self.advance();
            self.consume(&TokenKind::LeftParen, "'(' after 'catch'")?;
            let variable = self.consume_identifier("catch variable")?;
            self.consume(&TokenKind::RightParen, "')' after catch variable")?;
            let body = Box::new(self.parse_block_after_keyword()?);
            Some(CatchClause {
                variable,
                body,
                position: catch_position,
                node_id: next_node_id(),
            })
        } else {
            None
        };
        self.skip_newlines();
        let finally = if self.check(&TokenKind::Finally) {
            self.advance();
            Some(Box::new(self.parse_block_after_keyword()?))
        } else {
            None
        };
        if catch.is_none() && finally.is_none() {
            return Err(ParseError::InvalidSyntax {
                message: "try requires a catch or finally block".to_string(),
                position,
            });
        }
        Ok(Stmt::Try {
            body,
            catch,
            finally,
            position,
        })
    }

    fn parse_block_after_keyword(&mut self) -> Result<Stmt, ParseError> {
        self.skip_newlines();
        if !self.check(&TokenKind::LeftBrace) {
            return Err(ParseError::UnexpectedToken {
                expected: "'{'".to_string(),
                found: self.peek().kind.clone(),
                position: self.current_position(),
            });
        }
        self.parse_block()
    }

    fn parse_if(&mut self) -> Result<Stmt, ParseError> {
        let position = self.current_position();
        self.advance(); // if
        self.consume(&TokenKind::LeftParen, "'(' after 'if'")?;
        self.skip_newlines();
        let condition = self.parse_expression()?;
        self.skip_newlines();
        self.consume(&TokenKind::RightParen, "')' after condition")?;
        let then_branch = Box::new(self.parse_block_after_keyword()?);
        // `else` may sit on the next line.
        let saved = self.current;
        self.skip_newlines();
        let else_branch = if self.check(&TokenKind::Else) {
            self.advance();
            self.skip_newlines();
            if self.check(&TokenKind::If) {
                Some(Box::new(self.parse_if()?))
            } else {
                Some(Box::new(self.parse_block_after_keyword()?))
            }
        } else {
            self.current = saved;
            None
        };
        Ok(Stmt::If {
            condition,
            then_branch,
            else_branch,
            position,
        })
    }

    fn parse_while(&mut self) -> Result<Stmt, ParseError> {
        let position = self.current_position();
        self.advance(); // while
        self.consume(&TokenKind::LeftParen, "'(' after 'while'")?;
        self.skip_newlines();
        let condition = self.parse_expression()?;
        self.skip_newlines();
        self.consume(&TokenKind::RightParen, "')' after condition")?;
        let body = Box::new(self.parse_block_after_keyword()?);
        Ok(Stmt::While {
            condition,
            body,
            position,
        })
    }

    fn parse_for(&mut self) -> Result<Stmt, ParseError> {
        let position = self.current_position();
        self.advance(); // for
        if self.check(&TokenKind::LeftParen) {
            self.advance();
            let init = if self.check(&TokenKind::Semicolon) {
                self.advance();
                None
            } else if self.check(&TokenKind::Var) {
                Some(Box::new(self.parse_for_init_declaration()?))
            } else {
                let expr = self.parse_expression()?;
                let expr_position = expr.position().clone();
                self.consume(&TokenKind::Semicolon, "';' after loop initializer")?;
                Some(Box::new(Stmt::Expression {
                    expr,
                    position: expr_position,
                }))
            };
            let condition = if self.check(&TokenKind::Semicolon) {
                None
            } else {
                Some(self.parse_expression()?)
            };
            self.consume(&TokenKind::Semicolon, "';' after loop condition")?;
            let step = if self.check(&TokenKind::RightParen) {
                None
            } else {
                Some(self.parse_expression()?)
            };
            self.consume(&TokenKind::RightParen, "')' after loop clauses")?;
            let body = Box::new(self.parse_block_after_keyword()?);
            Ok(Stmt::For {
                init,
                condition,
                step,
                body,
                position,
            })
        } else {
            let variable = self.consume_identifier("loop variable")?;
            self.consume(&TokenKind::In, "'in' after loop variable")?;
            let iterable = self.parse_expression()?;
            let body = Box::new(self.parse_block_after_keyword()?);
            Ok(Stmt::ForIn {
                variable,
                iterable,
                body,
                position,
                node_id: next_node_id(),
            })
        }
    }

    /// Loop initializer form of `var`, terminated by ';' instead of a
    /// statement separator.
    fn parse_for_init_declaration(&mut self) -> Result<Stmt, ParseError> {
        let position = self.current_position();
        self.advance(); // var
        let name = self.consume_identifier("variable name")?;
        let hint = if self.check(&TokenKind::Colon) {
            self.advance();
            self.parse_type_hint()?
        } else {
            TypeHint::Dynamic
        };
        let initializer = if self.check(&TokenKind::Equal) {
            self.advance();
            Some(self.parse_expression()?)
        } else {
            None
        };
        self.consume(&TokenKind::Semicolon, "';' after loop initializer")?;
        Ok(Stmt::VarDecl {
            decl: VariableDecl {
                name,
                hint,
                initializer,
                mutable: true,
                position,
                node_id: next_node_id(),
            },
        })
    }

    fn parse_expression_statement(&mut self) -> Result<Stmt, ParseError> {
        let position = self.current_position();
        let expr = self.parse_expression()?;
        self.consume_terminator()?;
        Ok(Stmt::Expression { expr, position })
    }

    //=====================================================
    //            Section 5: Expressions
    //=====================================================

    pub fn parse_expression(&mut self) -> Result<Expr, ParseError> {
        self.parse_assignment()
    }

    fn parse_assignment(&mut self) -> Result<Expr, ParseError> {
        let expr = self.parse_or()?;
        if self.check(&TokenKind::Equal) {
            let position = self.current_position();
            self.advance();
            self.skip_newlines();
            let value = Box::new(self.parse_assignment()?);
            return match expr {
                Expr::Identifier { name, position, .. } => Ok(Expr::Assign {
                    name,
                    value,
                    position,
                    node_id: next_node_id(),
                }),
                Expr::PropertyGet {
                    object,
                    name,
                    position,
                } => Ok(Expr::PropertySet {
                    object,
                    name,
                    value,
                    position,
                }),
                Expr::IndexGet {
                    object,
                    index,
                    position,
                } => Ok(Expr::IndexSet {
                    object,
                    index,
                    value,
                    position,
                }),
                _ => Err(ParseError::InvalidSyntax {
                    message: "invalid assignment target".to_string(),
                    position,
                }),
            };
        }
        Ok(expr)
    }

    fn parse_or(&mut self) -> Result<Expr, ParseError> {
        let mut expr = self.parse_and()?;
        while matches!(self.peek().kind, TokenKind::Or | TokenKind::PipePipe) {
            let position = self.current_position();
            self.advance();
            self.skip_newlines();
            let right = self.parse_and()?;
            expr = Expr::Logical {
                left: Box::new(expr),
                operator: LogicalOp::Or,
                right: Box::new(right),
                position,
            };
        }
        Ok(expr)
    }

    fn parse_and(&mut self) -> Result<Expr, ParseError> {
        let mut expr = self.parse_equality()?;
        while matches!(self.peek().kind, TokenKind::And | TokenKind::AmpAmp) {
            let position = self.current_position();
            self.advance();
            self.skip_newlines();
            let right = self.parse_equality()?;
            expr = Expr::Logical {
                left: Box::new(expr),
                operator: LogicalOp::And,
                right: Box::new(right),
                position,
            };
        }
        Ok(expr)
    }

    fn parse_equality(&mut self) -> Result<Expr, ParseError> {
        let mut expr = self.parse_type_operation()?;
        loop {
            let operator = match self.peek().kind {
                TokenKind::EqualEqual => BinaryOp::Equal,
                TokenKind::BangEqual => BinaryOp::NotEqual,
                _ => break,
            };
            let position = self.current_position();
            self.advance();
            self.skip_newlines();
            let right = self.parse_type_operation()?;
            expr = Expr::Binary {
                left: Box::new(expr),
                operator,
                right: Box::new(right),
                position,
            };
        }
        Ok(expr)
    }

    fn parse_type_operation(&mut self) -> Result<Expr, ParseError> {
        let mut expr = self.parse_comparison()?;
        loop {
            match self.peek().kind {
                TokenKind::Is => {
                    let position = self.current_position();
                    self.advance();
                    let target = self.parse_type_hint()?;
                    expr = Expr::TypeCheck {
                        value: Box::new(expr),
                        target,
                        position,
                    };
                }
                TokenKind::As => {
                    let position = self.current_position();
                    self.advance();
                    let target = self.parse_type_hint()?;
                    expr = Expr::TypeCast {
                        value: Box::new(expr),
                        target,
                        position,
                    };
                }
                TokenKind::Implements => {
                    let position = self.current_position();
                    self.advance();
                    let interface = self.consume_identifier("interface name")?;
                    expr = Expr::Implements {
                        object: Box::new(expr),
                        interface,
                        position,
                    };
                }
                _ => break,
            }
        }
        Ok(expr)
    }

    fn parse_comparison(&mut self) -> Result<Expr, ParseError> {
        let mut expr = self.parse_term()?;
        loop {
            let operator = match self.peek().kind {
                TokenKind::Less => BinaryOp::Less,
                TokenKind::LessEqual => BinaryOp::LessEqual,
                TokenKind::Greater => BinaryOp::Greater,
                TokenKind::GreaterEqual => BinaryOp::GreaterEqual,
                _ => break,
            };
            let position = self.current_position();
            self.advance();
            self.skip_newlines();
            let right = self.parse_term()?;
            expr = Expr::Binary {
                left: Box::new(expr),
                operator,
                right: Box::new(right),
                position,
            };
        }
        Ok(expr)
    }

    fn parse_term(&mut self) -> Result<Expr, ParseError> {
        let mut expr = self.parse_factor()?;
        loop {
            let operator = match self.peek().kind {
                TokenKind::Plus => BinaryOp::Add,
                TokenKind::Minus => BinaryOp::Subtract,
                _ => break,
            };
            let position = self.current_position();
            self.advance();
            self.skip_newlines();
            let right = self.parse_factor()?;
            expr = Expr::Binary {
                left: Box::new(expr),
                operator,
                right: Box::new(right),
                position,
            };
        }
        Ok(expr)
    }

    fn parse_factor(&mut self) -> Result<Expr, ParseError> {
        let mut expr = self.parse_unary()?;
        loop {
            let operator = match self.peek().kind {
                TokenKind::Star => BinaryOp::Multiply,
                TokenKind::Slash => BinaryOp::Divide,
                TokenKind::Percent => BinaryOp::Modulo,
                _ => break,
            };
            let position = self.current_position();
            self.advance();
            self.skip_newlines();
            let right = self.parse_unary()?;
            expr = Expr::Binary {
                left: Box::new(expr),
                operator,
                right: Box::new(right),
                position,
            };
        }
        Ok(expr)
    }

    fn parse_unary(&mut self) -> Result<Expr, ParseError> {
        match self.peek().kind {
            TokenKind::Minus => {
                let position = self.current_position();
                self.advance();
                let operand = Box::new(self.parse_unary()?);
                Ok(Expr::Unary {
                    operator: UnaryOp::Minus,
                    operand,
                    position,
                })
            }
            TokenKind::Bang | TokenKind::Not => {
                let position = self.current_position();
                self.advance();
                let operand = Box::new(self.parse_unary()?);
                Ok(Expr::Unary {
                    operator: UnaryOp::Not,
                    operand,
                    position,
                })
            }
            TokenKind::Await => {
                let position = self.current_position();
                self.advance();
                let operand = Box::new(self.parse_unary()?);
                Ok(Expr::Await { operand, position })
            }
            _ => self.parse_call(),
        }
    }

    fn parse_call(&mut self) -> Result<Expr, ParseError> {
        let mut expr = self.parse_primary()?;
        loop {
            match self.peek().kind {
                TokenKind::LeftParen => {
                    let position = self.current_position();
                    let args = self.parse_argument_list()?;
                    expr = Expr::Call {
                        callee: Box::new(expr),
                        args,
                        position,
                    };
                }
                TokenKind::Dot => {
                    let position = self.current_position();
                    self.advance();
                    let name = self.consume_identifier("property name after '.'")?;
                    expr = Expr::PropertyGet {
                        object: Box::new(expr),
                        name,
                        position,
                    };
                }
                TokenKind::LeftBracket => {
                    let position = self.current_position();
                    self.advance();
                    self.skip_newlines();
                    let index = Box::new(self.parse_expression()?);
                    self.skip_newlines();
                    self.consume(&TokenKind::RightBracket, "']' after index")?;
                    expr = Expr::IndexGet {
                        object: Box::new(expr),
                        index,
                        position,
                    };
                }
                _ => break,
            }
        }
        Ok(expr)
    }

    fn parse_argument_list(&mut self) -> Result<Vec<Expr>, ParseError> {
        self.consume(&TokenKind::LeftParen, "'(' before arguments")?;
        self.skip_newlines();
        let mut args = Vec::new();
        if !self.check(&TokenKind::RightParen) {
            loop {
                args.push(self.parse_expression()?);
                self.skip_newlines();
                if !self.check(&TokenKind::Comma) {
                    break;
                }
                self.advance();
                self.skip_newlines();
            }
        }
        self.consume(&TokenKind::RightParen, "')' after arguments")?;
        Ok(args)
    }

    fn parse_primary(&mut self) -> Result<Expr, ParseError> {
        let position = self.current_position();
        match self.peek().kind.clone() {
            TokenKind::IntLiteral(value) => {
                self.advance();
                Ok(Expr::Literal {
                    value: Literal::Int(value),
                    position,
                })
            }
            TokenKind::Int64Literal(value) => {
                self.advance();
                Ok(Expr::Literal {
                    value: Literal::Int64(value),
                    position,
                })
            }
            TokenKind::FloatLiteral(value) => {
                self.advance();
                Ok(Expr::Literal {
                    value: Literal::Float(value),
                    position,
                })
            }
            TokenKind::StringLiteral(value) => {
                self.advance();
                Ok(Expr::Literal {
                    value: Literal::Str(value),
                    position,
                })
            }
            TokenKind::True => {
                self.advance();
                Ok(Expr::Literal {
                    value: Literal::Bool(true),
                    position,
                })
            }
            TokenKind::False => {
                self.advance();
                Ok(Expr::Literal {
                    value: Literal::Bool(false),
                    position,
                })
            }
            TokenKind::Null => {
                self.advance();
                Ok(Expr::Literal {
                    value: Literal::Null,
                    position,
                })
            }
            TokenKind::This => {
                self.advance();
                Ok(Expr::This {
                    position,
                    node_id: next_node_id(),
                })
            }
            TokenKind::New => {
                self.advance();
                let class = self.consume_identifier("class name after 'new'")?;
                let args = self.parse_argument_list()?;
                Ok(Expr::New {
                    class,
                    args,
                    position,
                    node_id: next_node_id(),
                })
            }
            TokenKind::Identifier(name) => {
                self.advance();
                Ok(Expr::Identifier {
                    name,
                    position,
                    node_id: next_node_id(),
                })
            }
            TokenKind::LeftParen => {
                self.advance();
                self.skip_newlines();
                let inner = Box::new(self.parse_expression()?);
                self.skip_newlines();
                self.consume(&TokenKind::RightParen, "')' after expression")?;
                Ok(Expr::Grouping { inner, position })
            }
            TokenKind::LeftBracket => {
                self.advance();
                self.skip_newlines();
                let mut elements = Vec::new();
                if !self.check(&TokenKind::RightBracket) {
                    loop {
                        elements.push(self.parse_expression()?);
                        self.skip_newlines();
                        if !self.check(&TokenKind::Comma) {
                            break;
                        }
                        self.advance();
                        self.skip_newlines();
                    }
                }
                self.consume(&TokenKind::RightBracket, "']' after array elements")?;
                Ok(Expr::Literal {
                    value: Literal::Array(elements),
                    position,
                })
            }
            TokenKind::Eof => Err(ParseError::UnexpectedEndOfInput {
                expected: "expression".to_string(),
                position,
            }),
            other => Err(ParseError::UnexpectedToken {
                expected: "expression".to_string(),
                found: other,
                position,
            }),
        }
    }

    //=====================================================
    //            Section 6: Type Hints
    //=====================================================

    fn parse_type_hint(&mut self) -> Result<TypeHint, ParseError> {
        let name = self.consume_identifier("type name")?;
        Ok(match name.as_str().to_ascii_lowercase().as_str() {
            "bool" => TypeHint::Bool,
            "int" => TypeHint::Int,
            "int64" => TypeHint::Int64,
            "float" => TypeHint::Float,
            "float64" => TypeHint::Float64,
            "string" => TypeHint::Str,
            "array" => TypeHint::Array,
            _ => TypeHint::Named(name),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::SourceText;
    use crate::tokenizer::Lexer;

    fn parse(source: &str) -> (Program, Vec<ParseError>) {
        let source = SourceText::new("test.vsp", source);
        let mut diagnostics = Diagnostics::new();
        let tokens = Lexer::new(&source, &mut diagnostics).tokenize();
        assert!(!diagnostics.has_errors(), "lexical errors: {diagnostics:?}");
        let mut parser = Parser::new(tokens);
        let program = parser.parse();
        (program, parser.errors().to_vec())
    }

    #[test]
    fn precedence_binds_multiplication_tighter() {
        let (program, errors) = parse("var x = 1 + 2 * 3");
        assert!(errors.is_empty(), "{errors:?}");
        let Stmt::VarDecl { decl } = &program.statements[0] else {
            panic!("expected var declaration");
        };
        let Some(Expr::Binary { operator, right, .. }) = &decl.initializer else {
            panic!("expected binary initializer");
        };
        assert_eq!(*operator, BinaryOp::Add);
        assert!(matches!(
            right.as_ref(),
            Expr::Binary {
                operator: BinaryOp::Multiply,
                ..
            }
        ));
    }

    #[test]
    fn parser_recovers_and_reports_multiple_errors() {
        let (program, errors) = parse("var = 1\nvar ok = 2\nprint +\nprint ok");
        assert_eq!(errors.len(), 2, "{errors:?}");
        // Well-formed statements around the bad ones still parsed.
        assert!(program
            .statements
            .iter()
            .any(|s| matches!(s, Stmt::VarDecl { .. })));
        assert!(program
            .statements
            .iter()
            .any(|s| matches!(s, Stmt::Print { .. })));
    }

    #[test]
    fn instantiation_statement_and_expression_forms() {
        let (program, errors) = parse("new p = Point(1, 2)\nvar q = new Point(3, 4)");
        assert!(errors.is_empty(), "{errors:?}");
        assert!(matches!(&program.statements[0], Stmt::Instantiate { .. }));
        let Stmt::VarDecl { decl } = &program.statements[1] else {
            panic!("expected var declaration");
        };
        assert!(matches!(decl.initializer, Some(Expr::New { .. })));
    }

    #[test]
    fn await_binds_below_call() {
        let (program, errors) = parse("print await fetch()");
        assert!(errors.is_empty(), "{errors:?}");
        let Stmt::Print { expr, .. } = &program.statements[0] else {
            panic!("expected print");
        };
        let Expr::Await { operand, .. } = expr else {
            panic!("expected await");
        };
        assert!(matches!(operand.as_ref(), Expr::Call { .. }));
    }

    #[test]
    fn class_body_members_parse() {
        let src = "class Point implements Printable {\n var x: int = 0\n func init(x) { this.x = x }\n abstract func describe()\n}";
        let (program, errors) = parse(src);
        assert!(errors.is_empty(), "{errors:?}");
        let Stmt::ClassDecl { decl } = &program.statements[0] else {
            panic!("expected class");
        };
        assert_eq!(decl.interfaces.len(), 1);
        assert_eq!(decl.members.len(), 3);
    }

    #[test]
    fn semicolon_and_newline_both_terminate() {
        let (program, errors) = parse("print 1; print 2\nprint 3");
        assert!(errors.is_empty(), "{errors:?}");
        assert_eq!(program.statements.len(), 3);
    }
}

//=====================================================
// End of file
//=====================================================
