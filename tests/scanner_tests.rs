use v_compiler::scanner::{ScanError, Scanner, Token, TokenKind};

fn scan_all(src: &str) -> Vec<Token> {
    let mut scanner = Scanner::from_source(src).expect("scanner construction failed");
    let mut tokens = Vec::new();
    loop {
        let tok = scanner.scan().expect("scan failed");
        let done = tok.kind == TokenKind::Eof;
        tokens.push(tok);
        if done {
            break;
        }
    }
    tokens
}

fn kinds(src: &str) -> Vec<TokenKind> {
    scan_all(src).into_iter().map(|t| t.kind).collect()
}

#[test]
fn keywords_and_identifiers() {
    assert_eq!(
        kinds("program foo begin end"),
        vec![
            TokenKind::Program,
            TokenKind::Ident,
            TokenKind::Begin,
            TokenKind::End,
            TokenKind::Eof,
        ]
    );
}

#[test]
fn null_is_reserved() {
    assert_eq!(kinds("null"), vec![TokenKind::Null, TokenKind::Eof]);
}

#[test]
fn multi_char_operators_disambiguate() {
    assert_eq!(
        kinds("== = != ! <= < >= >"),
        vec![
            TokenKind::Eq,
            TokenKind::Assign,
            TokenKind::Neq,
            TokenKind::Bang,
            TokenKind::Leq,
            TokenKind::Lt,
            TokenKind::Geq,
            TokenKind::Gt,
            TokenKind::Eof,
        ]
    );
}

#[test]
fn positions_are_line_col_and_byte_offset() {
    let tokens = scan_all("ab\n  cd");
    assert_eq!(tokens[0].text, "ab");
    assert_eq!((tokens[0].line, tokens[0].col, tokens[0].pos), (1, 1, 0));
    assert_eq!(tokens[1].text, "cd");
    assert_eq!((tokens[1].line, tokens[1].col, tokens[1].pos), (2, 3, 5));
}

#[test]
fn crlf_counts_as_one_line_end() {
    let tokens = scan_all("a\r\nb\rc");
    assert_eq!(tokens[1].line, 2);
    assert_eq!(tokens[2].line, 3);
}

#[test]
fn line_comment_produces_no_token() {
    assert_eq!(
        kinds("1 // trailing words\n2"),
        vec![TokenKind::IntLit, TokenKind::IntLit, TokenKind::Eof]
    );
}

#[test]
fn block_comments_nest_and_track_lines() {
    let tokens = scan_all("/* outer /* inner */ still\nout */ x");
    assert_eq!(tokens[0].kind, TokenKind::Ident);
    assert_eq!(tokens[0].line, 2);
}

#[test]
fn integer_then_dot_rewinds_to_member_access() {
    assert_eq!(
        kinds("1.foo"),
        vec![
            TokenKind::IntLit,
            TokenKind::Dot,
            TokenKind::Ident,
            TokenKind::Eof
        ]
    );
}

#[test]
fn real_literal_forms() {
    for src in ["1.5", ".5", "1.5e3", "1.5e+3", "1.25E-2", "1.5d", "2.0D"] {
        let tokens = scan_all(src);
        assert_eq!(tokens[0].kind, TokenKind::RealLit, "source {src:?}");
        assert_eq!(tokens[0].text, src);
    }
}

#[test]
fn hex_integers() {
    let tokens = scan_all("0x1F 0XAB");
    assert_eq!(tokens[0].kind, TokenKind::IntLit);
    assert_eq!(tokens[0].text, "0x1F");
    assert_eq!(tokens[1].kind, TokenKind::IntLit);
}

#[test]
fn string_keeps_raw_lexeme() {
    let tokens = scan_all(r#""he\tllo""#);
    assert_eq!(tokens[0].kind, TokenKind::StringLit);
    assert_eq!(tokens[0].text, r#""he\tllo""#);
}

#[test]
fn unterminated_string_is_fatal() {
    let mut scanner = Scanner::from_source("\"abc\n").unwrap();
    assert!(matches!(
        scanner.scan(),
        Err(ScanError::UnterminatedString { line: 1, .. })
    ));
}

#[test]
fn unknown_escape_is_fatal() {
    let mut scanner = Scanner::from_source(r#""a\qb""#).unwrap();
    assert!(matches!(scanner.scan(), Err(ScanError::BadEscape { .. })));
}

#[test]
fn bom_is_stripped() {
    let mut bytes = vec![0xEF, 0xBB, 0xBF];
    bytes.extend_from_slice(b"x");
    let mut scanner = Scanner::from_bytes(&bytes).unwrap();
    let tok = scanner.scan().unwrap();
    assert_eq!(tok.kind, TokenKind::Ident);
    assert_eq!(tok.pos, 3);
}

#[test]
fn partial_bom_is_fatal() {
    assert!(matches!(
        Scanner::from_bytes(&[0xEF, 0x41, 0x42]),
        Err(ScanError::InvalidBom)
    ));
}

#[test]
fn unicode_escapes_decode_into_identifiers() {
    let tokens = scan_all(r"\u0041bc");
    assert_eq!(tokens[0].kind, TokenKind::Ident);
    assert_eq!(tokens[0].text, "Abc");
}

#[test]
fn unknown_character_becomes_sentinel_token() {
    let tokens = scan_all("@");
    assert_eq!(tokens[0].kind, TokenKind::Unknown);
    assert_eq!(tokens[0].text, "@");
}

#[test]
fn peek_walks_ahead_without_consuming() {
    let mut scanner = Scanner::from_source("a b c").unwrap();
    assert_eq!(scanner.peek().unwrap().text, "a");
    assert_eq!(scanner.peek().unwrap().text, "b");
    assert_eq!(scanner.peek().unwrap().text, "c");
    // consuming starts from the front of the queue
    assert_eq!(scanner.scan().unwrap().text, "a");
    // the peek cursor stays where it was
    assert_eq!(scanner.peek().unwrap().kind, TokenKind::Eof);
}

#[test]
fn reset_peek_rewinds_to_the_scan_cursor() {
    let mut scanner = Scanner::from_source("a b").unwrap();
    assert_eq!(scanner.peek().unwrap().text, "a");
    assert_eq!(scanner.peek().unwrap().text, "b");
    scanner.reset_peek();
    assert_eq!(scanner.peek().unwrap().text, "a");
    assert_eq!(scanner.scan().unwrap().text, "a");
    assert_eq!(scanner.scan().unwrap().text, "b");
}
