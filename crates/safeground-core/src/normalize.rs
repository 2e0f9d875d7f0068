//! Text normalisation for evalNm free text and district reference keys.
//!
//! Converts raw strings such as `"서울특별시 종로구 청운동(1,2공사) 지반침하"`
//! into a comparable canonical form (`"서울 종로구 청운동 지반침하"`) so that
//! registry keys and free text can be compared byte-for-byte.
//!
//! # Conventions handled
//!
//! - Full-width ASCII and the ideographic space from Korean IMEs
//! - Hanja administrative characters (`洞`, `區`)
//! - Parenthetical qualifiers: `(1,2공사)`, `[긴급]`, `<보완>`
//! - Standalone numeric codes: `2023`, `12-3`, `1,2`
//! - Split suffixes: `청운 동`, `cheongun-dong`
//! - Ordinal dongs: `상계제1동` is `상계1동`
//! - Metropolitan city suffixes: `서울특별시`, `서울시` are `서울`

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;

/// Suffix tokens that are glued onto the preceding token when written apart.
const SUFFIX_TOKENS: &[&str] = &["동", "가", "구", "시", "읍", "면", "dong", "gu"];

static PARENTHETICAL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\([^()]*\)|\[[^\[\]]*\]|<[^<>]*>|\{[^{}]*\}|【[^【】]*】")
        .expect("parenthetical pattern compiles")
});

static ORDINAL_DONG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"제+(\d+)동").expect("ordinal pattern compiles"));

static METRO_CITY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(서울|부산|대구|인천|광주|대전|울산|세종)(?:특별자치시|특별시|광역시|시)+$")
        .expect("metro city pattern compiles")
});

/// Canonical form of a raw text field.
///
/// Only [`normalize`] builds one, so every value upholds
/// `normalize(x.as_str()) == x`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NormalizedText(String);

impl NormalizedText {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Length in characters (Hangul syllables count as one).
    pub fn char_len(&self) -> usize {
        self.0.chars().count()
    }

    /// Space-separated tokens.
    pub fn tokens(&self) -> impl Iterator<Item = &str> {
        self.0.split(' ').filter(|t| !t.is_empty())
    }

    /// True if any alphabetic character (Latin, Hangul, Hanja, ...) is present.
    pub fn has_script_content(&self) -> bool {
        self.0.chars().any(char::is_alphabetic)
    }
}

impl AsRef<str> for NormalizedText {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NormalizedText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Normalise a raw evalNm string (or registry key) into its canonical form.
///
/// # Algorithm
///
/// 1. Fold full-width forms and Hanja suffixes, then lowercase
/// 2. Remove bracketed qualifiers together with their contents
/// 3. Replace punctuation with spaces (keeping `.`/`,` between digits)
/// 4. Collapse whitespace and drop standalone numeric tokens
/// 5. Glue split suffixes, strip ordinal `제`, reduce metro-city names
///
/// If nothing survives, the input is returned trimmed and
/// whitespace-collapsed instead. Never fails; idempotent.
pub fn normalize(raw: &str) -> NormalizedText {
    let folded = fold_width_and_case(raw);
    let unbracketed = PARENTHETICAL.replace_all(&folded, " ");
    let depunctuated = strip_punctuation(&unbracketed);

    let tokens: Vec<&str> = depunctuated
        .split_whitespace()
        .filter(|t| !is_numeric_token(t))
        .collect();
    let tokens = standardize_suffixes(&tokens);

    if tokens.is_empty() {
        return NormalizedText(collapse_whitespace(raw));
    }
    NormalizedText(tokens.join(" "))
}

/// Trim and collapse runs of whitespace to single spaces.
pub fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn fold_width_and_case(s: &str) -> String {
    let folded: String = s
        .chars()
        .map(|c| match c {
            '\u{FF01}'..='\u{FF5E}' => char::from_u32(c as u32 - 0xFEE0).unwrap_or(c),
            '\u{3000}' => ' ',
            '\u{00B7}' | '\u{30FB}' | '\u{FF65}' => '.',
            '洞' => '동',
            '區' => '구',
            _ => c,
        })
        .collect();
    folded.to_lowercase()
}

fn strip_punctuation(s: &str) -> String {
    let chars: Vec<char> = s.chars().collect();
    let mut out = String::with_capacity(s.len());

    for (i, &c) in chars.iter().enumerate() {
        if c.is_alphanumeric() || c.is_whitespace() {
            out.push(c);
            continue;
        }
        // Keep separators inside numbers like "1.2.3.4가동".
        let between_digits = (c == '.' || c == ',')
            && i > 0
            && chars[i - 1].is_ascii_digit()
            && chars.get(i + 1).is_some_and(char::is_ascii_digit);
        out.push(if between_digits { c } else { ' ' });
    }
    out
}

fn is_numeric_token(token: &str) -> bool {
    token.chars().any(char::is_numeric)
        && token.chars().all(|c| c.is_numeric() || c == '.' || c == ',')
}

fn standardize_suffixes(tokens: &[&str]) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(tokens.len());

    for &token in tokens {
        match out.last_mut() {
            Some(prev) if SUFFIX_TOKENS.contains(&token) => prev.push_str(token),
            _ => out.push(token.to_string()),
        }
    }

    for token in &mut out {
        if token.contains('제') {
            *token = ORDINAL_DONG.replace_all(token, "${1}동").into_owned();
        }
        if let Some(caps) = METRO_CITY.captures(token) {
            *token = caps[1].to_string();
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn n(s: &str) -> String {
        normalize(s).into_string()
    }

    #[test]
    fn collapses_whitespace() {
        assert_eq!(n("  종로구 \t 청운동\n"), "종로구 청운동");
    }

    #[test]
    fn full_width_and_case() {
        assert_eq!(n("ＳＥＯＵＬ　Jongno"), "seoul jongno");
        assert_eq!(n("（보완）청운동"), "청운동");
    }

    #[test]
    fn hanja_suffixes() {
        assert_eq!(n("淸雲洞"), "淸雲동");
        assert_eq!(n("鍾路區"), "鍾路구");
    }

    #[test]
    fn strips_parenthetical_qualifiers() {
        assert_eq!(
            n("포천동성남시탄리(1,2공사) 향후계획서의 설치공사"),
            "포천동성남시탄리 향후계획서의 설치공사"
        );
        assert_eq!(n("[긴급] 청운동 <보완>"), "청운동");
    }

    #[test]
    fn unbalanced_brackets_become_spaces() {
        assert_eq!(n("청운동 (지반"), "청운동 지반");
        assert_eq!(n("청운동((지반))"), "청운동");
        // Nothing survives the full rules, so the raw text comes back.
        assert_eq!(n("((청운동))"), "((청운동))");
    }

    #[test]
    fn drops_standalone_numeric_codes() {
        assert_eq!(n("2023 청운동 12-3 1,2"), "청운동");
        assert_eq!(n("창신1동"), "창신1동");
    }

    #[test]
    fn keeps_dotted_official_names() {
        assert_eq!(n("종로1.2.3.4가동"), "종로1.2.3.4가동");
        assert_eq!(n("종로1·2·3·4가동"), "종로1.2.3.4가동");
    }

    #[test]
    fn trailing_punctuation_removed() {
        assert_eq!(n("청운동!!"), "청운동");
        assert_eq!(n("청운동."), "청운동");
    }

    #[test]
    fn glues_split_suffixes() {
        assert_eq!(n("종로 구 청운 동"), "종로구 청운동");
        assert_eq!(n("Cheongun-dong, Jongno-gu"), "cheongundong jongnogu");
    }

    #[test]
    fn glues_every_listed_suffix() {
        assert_eq!(n("포천 시 탄리"), "포천시 탄리");
        assert_eq!(n("청평 읍"), "청평읍");
        assert_eq!(n("상 면 일대"), "상면 일대");
        assert_eq!(n("종로 1 가"), "종로가");
        assert_eq!(n("Sinsa dong Gangnam gu"), "sinsadong gangnamgu");
    }

    #[test]
    fn leading_suffix_token_is_kept() {
        assert_eq!(n("동 인근"), "동 인근");
    }

    #[test]
    fn ordinal_dong() {
        assert_eq!(n("상계제1동"), "상계1동");
        assert_eq!(n("상계 제 1 동"), "상계 제동");
        assert_eq!(n("제기동"), "제기동");
    }

    #[test]
    fn metro_city_suffixes() {
        assert_eq!(n("서울특별시 종로구"), "서울 종로구");
        assert_eq!(n("서울시 종로구"), "서울 종로구");
        assert_eq!(n("서울 특별시"), "서울 특별시");
        assert_eq!(n("부산광역시"), "부산");
        assert_eq!(n("세종특별자치시"), "세종");
        assert_eq!(n("서울시청"), "서울시청");
    }

    #[test]
    fn unnormalisable_text_is_minimally_cleaned() {
        assert_eq!(n("  (1,2공사)  "), "(1,2공사)");
        assert_eq!(n(" !!  ?? "), "!! ??");
        assert_eq!(n(""), "");
        assert_eq!(n("   "), "");
    }

    #[test]
    fn script_content() {
        assert!(normalize("청운동").has_script_content());
        assert!(!normalize("1234 !!").has_script_content());
        assert!(!normalize("").has_script_content());
    }

    #[test]
    fn tokens_and_char_len() {
        let t = normalize("종로구  청운동");
        assert_eq!(t.tokens().collect::<Vec<_>>(), vec!["종로구", "청운동"]);
        assert_eq!(t.char_len(), 7);
    }

    #[test]
    fn idempotent_on_examples() {
        for raw in [
            "서울특별시 종로구 청운동(1,2공사) 지반침하",
            "((청운동))",
            "서울시시",
            "제제1동",
            "  (1,2공사)  ",
            "Cheongun-dong",
            "İstanbul",
            "1 동",
        ] {
            let once = normalize(raw);
            assert_eq!(normalize(once.as_str()), once, "input {raw:?}");
        }
    }

    fn evalnm_like() -> impl Strategy<Value = String> {
        prop::collection::vec(
            prop_oneof![
                4 => "[가-힣]{1,4}",
                2 => "[a-zA-Z]{1,6}",
                2 => "[0-9]{1,4}",
                2 => prop::sample::select(vec![
                    " ", "  ", "\t", "\u{3000}", "(", ")", "[", "]", "<", ">", ".", ",", "-",
                    "·", "!", "동", " 동", "구", " 구", "제", "시", "특별시", "광역시",
                    "서울", "洞", "區", "Ａ", "（", "）",
                ])
                .prop_map(str::to_string),
            ],
            0..16,
        )
        .prop_map(|parts| parts.concat())
    }

    proptest! {
        #[test]
        fn normalize_is_idempotent(raw in evalnm_like()) {
            let once = normalize(&raw);
            prop_assert_eq!(normalize(once.as_str()), once);
        }

        #[test]
        fn normalize_is_idempotent_on_any_string(raw in any::<String>()) {
            let once = normalize(&raw);
            prop_assert_eq!(normalize(once.as_str()), once);
        }

        #[test]
        fn output_has_no_edge_or_double_spaces(raw in evalnm_like()) {
            let out = normalize(&raw).into_string();
            prop_assert_eq!(out.trim(), out.as_str());
            prop_assert!(!out.contains("  "));
        }
    }
}
