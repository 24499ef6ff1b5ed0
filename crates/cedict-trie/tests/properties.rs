use std::collections::HashSet;

use cedict_trie::{Format, Lexer, Trie, extract, parse_trie, serialize, tokenize};
use cedict_types::{Token, TokenKind};

const ALPHABET: [char; 6] = ['不', '太', '好', '她', '。', '\n'];

/// Small deterministic generator so the cases are reproducible.
struct Lcg(u64);

impl Lcg {
    fn next(&mut self) -> u64 {
        self.0 = self
            .0
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        self.0 >> 33
    }

    fn below(&mut self, n: usize) -> usize {
        (self.next() % n as u64) as usize
    }

    fn word(&mut self, max_len: usize) -> String {
        let len = 1 + self.below(max_len);
        (0..len).map(|_| ALPHABET[self.below(ALPHABET.len())]).collect()
    }
}

fn random_trie(rng: &mut Lcg, keys: usize) -> Trie {
    let mut trie = Trie::new();
    for i in 0..keys {
        let key = rng.word(4);
        trie.insert(&key, &format!("{key} #{i}"));
    }
    trie
}

fn cases() -> Vec<(Trie, String)> {
    let mut rng = Lcg(0x5eed);
    (0..200)
        .map(|i| {
            let trie = random_trie(&mut rng, i % 12);
            let text = rng.word(30);
            (trie, text)
        })
        .collect()
}

fn dictionary_tokens(tokens: Vec<Token>) -> Vec<Token> {
    tokens
        .into_iter()
        .filter(|t| t.kind == TokenKind::Dictionary)
        .collect()
}

#[test]
fn tokens_tile_the_text() {
    for (trie, text) in cases() {
        let tokens = tokenize(&trie, &text);
        let len = text.chars().count();
        let mut expected_start = 0;
        for token in &tokens {
            assert_eq!(token.start, expected_start, "gap or overlap in {text:?}");
            assert!(token.end > token.start);
            let surface: String = text.chars().skip(token.start).take(token.len()).collect();
            assert_eq!(surface, token.word);
            expected_start = token.end;
        }
        assert_eq!(expected_start, len);
    }
}

#[test]
fn dictionary_tokens_are_longest_matches() {
    for (trie, text) in cases() {
        let chars: Vec<char> = text.chars().collect();
        for token in tokenize(&trie, &text) {
            let longest = (token.start + 1..=chars.len())
                .filter(|&end| {
                    let key: String = chars[token.start..end].iter().collect();
                    trie.contains_key(&key)
                })
                .max();
            match token.kind {
                TokenKind::Dictionary => {
                    assert_eq!(longest, Some(token.end));
                    assert_eq!(trie.get(&token.word), Some(token.entry.as_str()));
                }
                _ => assert_eq!(longest, None, "missed a match at {}", token.start),
            }
        }
    }
}

#[test]
fn fallback_kinds_follow_character_class() {
    let trie = Trie::new();
    let kinds: Vec<TokenKind> = tokenize(&trie, "她\n。，x")
        .into_iter()
        .map(|t| t.kind)
        .collect();
    assert_eq!(
        kinds,
        vec![
            TokenKind::Unknown,
            TokenKind::Newline,
            TokenKind::Punctuation,
            TokenKind::Punctuation,
            TokenKind::Unknown,
        ]
    );
}

#[test]
fn merged_values_keep_insertion_order() {
    let mut trie = Trie::new();
    trie.insert("key", "A");
    trie.insert("key", "B");
    assert_eq!(trie.get("key"), Some("A\nB"));
    let tokens = tokenize(&trie, "key");
    assert_eq!(tokens[0].entry, "A\nB");
}

#[test]
fn extraction_is_closed() {
    for (trie, text) in cases() {
        let sub = extract(&trie, &text);
        assert_eq!(
            dictionary_tokens(tokenize(&sub, &text)),
            dictionary_tokens(tokenize(&trie, &text))
        );
        for (key, value) in sub.entries() {
            assert_eq!(trie.get(&key), Some(value));
        }
    }
}

#[test]
fn serialized_tries_look_up_identically() {
    for (trie, text) in cases() {
        for format in [Format::Compact, Format::Readable, Format::Pretty] {
            let loaded = parse_trie(&serialize(&trie, format).unwrap()).unwrap();
            for (key, _) in trie.entries() {
                let chars: Vec<char> = key.chars().collect();
                assert_eq!(loaded.lookup(&chars, 0), trie.lookup(&chars, 0));
            }
            assert_eq!(tokenize(&loaded, &text), tokenize(&trie, &text));
        }
    }
}

#[test]
fn canonical_forms_ignore_insertion_order() {
    let mut rng = Lcg(42);
    let mut seen = HashSet::new();
    let pairs: Vec<(String, String)> = (0..40)
        .map(|i| (rng.word(5), format!("value {i}")))
        .filter(|(key, _)| seen.insert(key.clone()))
        .collect();
    let forward: Trie = pairs.iter().map(|(k, v)| (k, v)).collect();
    let backward: Trie = pairs.iter().rev().map(|(k, v)| (k, v)).collect();
    assert_eq!(forward, backward);
    for format in [Format::Readable, Format::Pretty] {
        assert_eq!(
            serialize(&forward, format).unwrap(),
            serialize(&backward, format).unwrap()
        );
    }
}

#[test]
fn she_is_not_so_good() {
    let mut trie: Trie = [
        ("她", "她 她 [tā] /she/"),
        ("不太好", "不太好 不太好 [bù tài hǎo] /not so good/not too well/"),
    ]
    .into_iter()
    .collect();
    let check = |trie: &Trie| {
        let tokens = Lexer::new(trie).tokenize("她不太好。");
        let summary: Vec<(&str, TokenKind, usize, usize)> = tokens
            .iter()
            .map(|t| (t.word.as_str(), t.kind, t.start, t.end))
            .collect();
        assert_eq!(
            summary,
            vec![
                ("她", TokenKind::Dictionary, 0, 1),
                ("不太好", TokenKind::Dictionary, 1, 4),
                ("。", TokenKind::Punctuation, 4, 5),
            ]
        );
    };
    check(&trie);
    trie.insert("不", "not");
    check(&trie);
}
