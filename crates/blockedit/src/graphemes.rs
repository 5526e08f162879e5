//! グラフェムクラスタ単位のカーソル移動・削除
//!
//! ドキュメントのオフセットは文字(char)単位で数えるため、
//! 絵文字や結合文字の途中で分割しないよう境界を char オフセットで返します。

use unicode_segmentation::UnicodeSegmentation;

/// 文字数を返す
pub fn char_len(text: &str) -> usize {
    text.chars().count()
}

/// char オフセット `from..to` の部分文字列
pub fn char_slice(text: &str, from: usize, to: usize) -> String {
    text.chars()
        .skip(from)
        .take(to.saturating_sub(from))
        .collect()
}

/// 各グラフェムクラスタの開始位置(char 単位)と末尾
fn boundaries(text: &str) -> Vec<usize> {
    let mut out = Vec::new();
    let mut chars = 0;
    for grapheme in text.graphemes(true) {
        out.push(chars);
        chars += grapheme.chars().count();
    }
    out.push(chars);
    out
}

/// `offset` より前にある最も近いクラスタ境界
pub fn prev_boundary(text: &str, offset: usize) -> usize {
    boundaries(text)
        .into_iter()
        .filter(|boundary| *boundary < offset)
        .last()
        .unwrap_or(0)
}

/// `offset` より後にある最も近いクラスタ境界
pub fn next_boundary(text: &str, offset: usize) -> usize {
    let bounds = boundaries(text);
    let end = bounds.last().copied().unwrap_or(0);
    bounds
        .into_iter()
        .find(|boundary| *boundary > offset)
        .unwrap_or(end)
}

/// 表示上の文字数
pub fn grapheme_count(text: &str) -> usize {
    text.graphemes(true).count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ascii_boundaries() {
        assert_eq!(prev_boundary("abc", 3), 2);
        assert_eq!(prev_boundary("abc", 0), 0);
        assert_eq!(next_boundary("abc", 1), 2);
        assert_eq!(next_boundary("abc", 3), 3);
    }

    #[test]
    fn test_japanese_text() {
        let text = "こんにちは";
        assert_eq!(char_len(text), 5);
        assert_eq!(prev_boundary(text, 5), 4);
        assert_eq!(char_slice(text, 1, 3), "んに");
    }

    #[test]
    fn test_combining_marks_stay_together() {
        // "e" + COMBINING ACUTE ACCENT
        let text = "ae\u{301}b";
        assert_eq!(char_len(text), 4);
        assert_eq!(grapheme_count(text), 3);
        assert_eq!(prev_boundary(text, 3), 1);
        assert_eq!(next_boundary(text, 1), 3);
    }

    #[test]
    fn test_zwj_emoji_is_one_cluster() {
        let family = "👨\u{200d}👩\u{200d}👧";
        let text = format!("x{}", family);
        let len = char_len(&text);
        assert_eq!(prev_boundary(&text, len), 1);
        assert_eq!(next_boundary(&text, 1), len);
    }
}
