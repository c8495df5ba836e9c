//! Tokenizer - jieba-backed segmentation for mixed CJK/Latin text / 分词器
//!
//! The same tokenizer runs over indexed fields and over queries so the two
//! always agree on term boundaries.

use jieba_rs::Jieba;
use once_cell::sync::Lazy;

/// Global jieba tokenizer instance / 全局 jieba 分词器实例
static JIEBA: Lazy<Jieba> = Lazy::new(Jieba::new);

/// Tokenize text / 对文本进行分词
///
/// Latin words are lowercased, CJK runs are segmented by jieba (search
/// engine mode). Pure punctuation tokens are dropped.
pub fn tokenize(text: &str) -> Vec<String> {
    let mut tokens = Vec::new();

    let words = JIEBA.cut_for_search(text, true);

    for word in words {
        let word = word.trim();
        if word.is_empty() {
            continue;
        }
        // Skip separators and punctuation-only segments / 跳过纯标点
        if !word.chars().any(|c| c.is_alphanumeric()) {
            continue;
        }

        tokens.push(word.to_lowercase());
    }

    tokens
}

/// Tokenize a search query / 对搜索查询进行分词
///
/// Query tokenization must stay consistent with index tokenization.
pub fn tokenize_query(query: &str) -> Vec<String> {
    tokenize(query)
}

/// Generate N-grams (for CJK fuzzy matching) / 生成 N-gram
///
/// Example: "测试" -> ["测", "试", "测试"]
pub fn generate_ngrams(text: &str, min_n: usize, max_n: usize) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    let mut ngrams = Vec::new();

    for n in min_n..=max_n {
        if n > chars.len() {
            break;
        }
        for i in 0..=(chars.len() - n) {
            let ngram: String = chars[i..i + n].iter().collect();
            if !ngram.trim().is_empty() {
                ngrams.push(ngram.to_lowercase());
            }
        }
    }

    ngrams
}

/// Check if text contains CJK characters (Chinese, Japanese, Korean) / 检测文本是否包含CJK字符
pub fn contains_cjk(text: &str) -> bool {
    text.chars().any(|c| {
        matches!(c,
            '\u{4e00}'..='\u{9fff}' |  // CJK Unified Ideographs
            '\u{3400}'..='\u{4dbf}' |  // CJK Extension A
            '\u{3040}'..='\u{309f}' |  // Hiragana
            '\u{30a0}'..='\u{30ff}' |  // Katakana
            '\u{ac00}'..='\u{d7af}'    // Hangul Syllables
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokenize_english() {
        let tokens = tokenize("Hello World Test");
        assert!(tokens.contains(&"hello".to_string()));
        assert!(tokens.contains(&"world".to_string()));
        assert!(tokens.contains(&"test".to_string()));
    }

    #[test]
    fn test_tokenize_filename() {
        let tokens = tokenize("apple.txt");
        assert!(tokens.contains(&"apple".to_string()));
        assert!(tokens.contains(&"txt".to_string()));
        // separator dot is not a token
        assert!(!tokens.contains(&".".to_string()));
    }

    #[test]
    fn test_tokenize_chinese() {
        let tokens = tokenize("中华人民共和国");
        assert!(!tokens.is_empty());
    }

    #[test]
    fn test_tokenize_mixed() {
        let tokens = tokenize("测试文件 report.pdf");
        assert!(tokens.contains(&"report".to_string()));
        assert!(!tokens.is_empty());
    }

    #[test]
    fn test_ngrams() {
        let ngrams = generate_ngrams("测试", 1, 2);
        assert!(ngrams.contains(&"测".to_string()));
        assert!(ngrams.contains(&"试".to_string()));
        assert!(ngrams.contains(&"测试".to_string()));
    }

    #[test]
    fn test_contains_cjk() {
        assert!(contains_cjk("测试"));
        assert!(contains_cjk("test測試"));
        assert!(!contains_cjk("test"));
    }
}
