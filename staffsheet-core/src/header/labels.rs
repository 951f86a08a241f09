//! Label normalization and the per-role label dictionary.
//!
//! Matching is a pure function from cell text to an optional
//! [`LabelMatch`]; nothing here looks at a sheet.

use crate::model::{FieldRole, MatchKind};
use std::collections::BTreeMap;
use unicode_normalization::UnicodeNormalization as _;

/// Confidence of a match against a role's canonical label
pub const EXACT_CONFIDENCE: f64 = 1.0;
/// Confidence of a match against a listed synonym
pub const SYNONYM_CONFIDENCE: f64 = 0.85;

/// Cells longer than this (after normalization) are never partial matches
const MAX_PARTIAL_TEXT_CHARS: usize = 24;

const DECORATIONS: &[char] = &['※', '*', ':', '・', '「', '」', '【', '】', '[', ']'];

/// Normalize header text for comparison.
///
/// NFKC folds full-width ASCII/digits and half-width katakana into one form,
/// then all whitespace (U+3000 included) and decorative marks are dropped and
/// the result lowercased.
pub fn normalize_label(text: &str) -> String {
    text.nfkc()
        .filter(|c| !c.is_whitespace() && !DECORATIONS.contains(c))
        .flat_map(|c| c.to_lowercase())
        .collect()
}

struct BuiltinLabels {
    role: FieldRole,
    canonical: &'static str,
    synonyms: &'static [&'static str],
}

// Entries are stored already normalized.
const BUILTIN: &[BuiltinLabels] = &[
    BuiltinLabels {
        role: FieldRole::EmployeeId,
        canonical: "社員番号",
        synonyms: &[
            "社員no",
            "社員no.",
            "社員id",
            "社員コード",
            "従業員番号",
            "従業員id",
            "従業員コード",
            "スタッフid",
            "スタッフno",
            "スタッフ番号",
            "スタッフコード",
            "派遣社員番号",
            "登録番号",
            "個人番号",
            "employeeid",
            "employee_id",
            "staffid",
        ],
    },
    BuiltinLabels {
        role: FieldRole::Name,
        canonical: "氏名",
        synonyms: &[
            "名前",
            "社員名",
            "従業員名",
            "スタッフ名",
            "派遣社員名",
            "派遣スタッフ名",
            "フルネーム",
            "name",
            "fullname",
            "employeename",
        ],
    },
    BuiltinLabels {
        role: FieldRole::DispatchCompany,
        canonical: "派遣元",
        synonyms: &[
            "派遣会社",
            "派遣元会社",
            "派遣元企業",
            "派遣会社名",
            "所属会社",
            "会社名",
            "dispatchcompany",
            "agency",
            "company",
        ],
    },
    BuiltinLabels {
        role: FieldRole::Department,
        canonical: "部署",
        synonyms: &[
            "部署名",
            "配属先",
            "配属部署",
            "所属",
            "所属部署",
            "部門",
            "就業先",
            "department",
            "dept",
        ],
    },
    BuiltinLabels {
        role: FieldRole::HireDate,
        canonical: "入社日",
        synonyms: &[
            "入社年月日",
            "採用日",
            "雇用開始日",
            "契約開始日",
            "就業開始日",
            "派遣開始日",
            "hiredate",
            "startdate",
        ],
    },
    BuiltinLabels {
        role: FieldRole::BirthDate,
        canonical: "生年月日",
        synonyms: &["誕生日", "birthdate", "dateofbirth", "dob"],
    },
    BuiltinLabels {
        role: FieldRole::Gender,
        canonical: "性別",
        synonyms: &["gender", "sex"],
    },
    BuiltinLabels {
        role: FieldRole::HourlyRate,
        canonical: "時給",
        synonyms: &[
            "基本時給",
            "支給時給",
            "支給単価",
            "時間給",
            "時間単価",
            "賃金単価",
            "hourlyrate",
            "hourlywage",
            "wage",
        ],
    },
    BuiltinLabels {
        role: FieldRole::BillingRate,
        canonical: "請求単価",
        synonyms: &[
            "請求時給",
            "請求時間単価",
            "請求レート",
            "単価",
            "billingrate",
            "billrate",
        ],
    },
    BuiltinLabels {
        role: FieldRole::WorkHours,
        canonical: "稼働時間",
        synonyms: &[
            "勤務時間",
            "労働時間",
            "実働時間",
            "総労働時間",
            "総稼働時間",
            "就業時間",
            "実労働時間",
            "workhours",
            "hours",
        ],
    },
    BuiltinLabels {
        role: FieldRole::BillingAmount,
        canonical: "請求金額",
        synonyms: &[
            "請求額",
            "請求合計",
            "請求合計額",
            "売上",
            "売上金額",
            "billingamount",
            "amount",
        ],
    },
    BuiltinLabels {
        role: FieldRole::Period,
        canonical: "対象年月",
        synonyms: &[
            "年月",
            "支給年月",
            "請求年月",
            "稼働年月",
            "対象月",
            "期間",
            "period",
            "month",
        ],
    },
];

/// A label matched by some cell text
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LabelMatch {
    pub role: FieldRole,
    pub confidence: f64,
    pub kind: MatchKind,
    /// Character count of the dictionary label that matched
    pub label_chars: usize,
}

#[derive(Debug, Clone)]
struct LabelEntry {
    role: FieldRole,
    label: String,
    kind: MatchKind,
    chars: usize,
}

/// Label dictionary for every [`FieldRole`].
///
/// Built once per parser and shared read-only across sheets.
#[derive(Debug, Clone)]
pub struct LabelDictionary {
    entries: Vec<LabelEntry>,
}

impl Default for LabelDictionary {
    fn default() -> Self {
        Self::builtin()
    }
}

impl LabelDictionary {
    /// The built-in Japanese/English dictionary
    pub fn builtin() -> Self {
        Self::with_extra(&BTreeMap::new())
    }

    /// Built-in dictionary plus caller synonyms, appended after the built-ins
    /// of the same role
    pub fn with_extra(extra: &BTreeMap<FieldRole, Vec<String>>) -> Self {
        let mut entries = Vec::new();
        for builtin in BUILTIN {
            entries.push(LabelEntry::new(
                builtin.role,
                builtin.canonical,
                MatchKind::Exact,
            ));
            for synonym in builtin.synonyms {
                entries.push(LabelEntry::new(builtin.role, synonym, MatchKind::Synonym));
            }
            for synonym in extra.get(&builtin.role).into_iter().flatten() {
                let entry = LabelEntry::new(builtin.role, synonym, MatchKind::Synonym);
                if !entry.label.is_empty() && !entries.iter().any(|e| e.label == entry.label) {
                    entries.push(entry);
                }
            }
        }
        Self { entries }
    }

    /// Labels registered for one role, canonical first
    pub fn labels_for(&self, role: FieldRole) -> impl Iterator<Item = &str> {
        self.entries
            .iter()
            .filter(move |e| e.role == role)
            .map(|e| e.label.as_str())
    }

    /// Classify raw cell text
    pub fn classify(&self, text: &str) -> Option<LabelMatch> {
        self.classify_normalized(&normalize_label(text))
    }

    /// Classify text that already went through [`normalize_label`].
    ///
    /// Exact and synonym matches compare the whole text; a partial match
    /// requires a dictionary label inside a short cell. The strongest match
    /// wins, ties going to the longer label and then to dictionary order.
    pub fn classify_normalized(&self, text: &str) -> Option<LabelMatch> {
        if text.is_empty() {
            return None;
        }

        if let Some(entry) = self.entries.iter().find(|e| e.label == text) {
            return Some(entry.full_match());
        }

        let text_chars = text.chars().count();
        if text_chars > MAX_PARTIAL_TEXT_CHARS {
            return None;
        }

        let mut best: Option<LabelMatch> = None;
        for entry in &self.entries {
            if entry.chars < entry.min_partial_chars() || !text.contains(entry.label.as_str()) {
                continue;
            }
            let candidate = LabelMatch {
                role: entry.role,
                confidence: 0.4 + 0.3 * entry.chars as f64 / text_chars as f64,
                kind: MatchKind::Partial,
                label_chars: entry.chars,
            };
            let better = match best {
                None => true,
                Some(current) => {
                    candidate.confidence > current.confidence
                        || (candidate.confidence == current.confidence
                            && candidate.label_chars > current.label_chars)
                }
            };
            if better {
                best = Some(candidate);
            }
        }
        best
    }

    /// Classify but only accept whole-label matches (exact or synonym)
    pub fn classify_whole(&self, text: &str) -> Option<LabelMatch> {
        let text = normalize_label(text);
        self.entries
            .iter()
            .find(|e| e.label == text)
            .map(LabelEntry::full_match)
    }
}

impl LabelEntry {
    fn new(role: FieldRole, label: &str, kind: MatchKind) -> Self {
        let label = normalize_label(label);
        let chars = label.chars().count();
        Self {
            role,
            label,
            kind,
            chars,
        }
    }

    fn full_match(&self) -> LabelMatch {
        let confidence = match self.kind {
            MatchKind::Exact => EXACT_CONFIDENCE,
            _ => SYNONYM_CONFIDENCE,
        };
        LabelMatch {
            role: self.role,
            confidence,
            kind: self.kind,
            label_chars: self.chars,
        }
    }

    // Short ASCII labels ("id", "no") hide inside ordinary words
    fn min_partial_chars(&self) -> usize {
        if self.label.is_ascii() { 4 } else { 2 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_folds_width_and_spacing() {
        assert_eq!(normalize_label("氏 名"), "氏名");
        assert_eq!(normalize_label("氏\u{3000}名"), "氏名");
        assert_eq!(normalize_label(" Ｎａｍｅ "), "name");
        assert_eq!(normalize_label("ｽﾀｯﾌID"), "スタッフid");
        assert_eq!(normalize_label("※時給："), "時給");
        assert_eq!(normalize_label("社員ＮＯ"), "社員no");
    }

    #[test]
    fn test_builtin_labels_are_normalized() {
        for builtin in BUILTIN {
            assert_eq!(normalize_label(builtin.canonical), builtin.canonical);
            for s in builtin.synonyms {
                assert_eq!(&normalize_label(s), s, "synonym {} not normalized", s);
            }
        }
    }

    #[test]
    fn test_exact_and_synonym_confidence() {
        let dict = LabelDictionary::builtin();

        let m = dict.classify("氏 名").unwrap();
        assert_eq!(m.role, FieldRole::Name);
        assert_eq!(m.kind, MatchKind::Exact);
        assert_eq!(m.confidence, EXACT_CONFIDENCE);

        let m = dict.classify("Name").unwrap();
        assert_eq!(m.role, FieldRole::Name);
        assert_eq!(m.kind, MatchKind::Synonym);
        assert_eq!(m.confidence, SYNONYM_CONFIDENCE);

        let m = dict.classify("請求時給").unwrap();
        assert_eq!(m.role, FieldRole::BillingRate);
    }

    #[test]
    fn test_partial_match_is_weaker() {
        let dict = LabelDictionary::builtin();

        let m = dict.classify("時給(円)").unwrap();
        assert_eq!(m.role, FieldRole::HourlyRate);
        assert_eq!(m.kind, MatchKind::Partial);
        assert!(m.confidence < SYNONYM_CONFIDENCE);
        assert!(m.confidence > 0.4);

        // Longest contained label decides
        let m = dict.classify("請求金額(税抜)").unwrap();
        assert_eq!(m.role, FieldRole::BillingAmount);
    }

    #[test]
    fn test_short_ascii_labels_do_not_partially_match() {
        let dict = LabelDictionary::builtin();
        assert!(dict.classify("paid").is_none());
        assert!(dict.classify("備考").is_none());
        assert!(dict.classify("").is_none());
        assert!(dict.classify("山田 太郎").is_none());
    }

    #[test]
    fn test_long_text_never_partially_matches() {
        let dict = LabelDictionary::builtin();
        let sentence = "この表は派遣スタッフの時給と稼働時間を月ごとにまとめたものです";
        assert!(dict.classify(sentence).is_none());
    }

    #[test]
    fn test_extra_synonyms() {
        let mut extra = BTreeMap::new();
        extra.insert(FieldRole::Name, vec!["担当者".to_string()]);
        let dict = LabelDictionary::with_extra(&extra);

        let m = dict.classify("担当者").unwrap();
        assert_eq!(m.role, FieldRole::Name);
        assert_eq!(m.kind, MatchKind::Synonym);
        assert!(dict.labels_for(FieldRole::Name).any(|l| l == "担当者"));
        assert!(LabelDictionary::builtin().classify("担当者").is_none());
    }

    #[test]
    fn test_classify_whole_rejects_partials() {
        let dict = LabelDictionary::builtin();
        assert!(dict.classify_whole("時給(円)").is_none());
        assert_eq!(
            dict.classify_whole("請求単価").map(|m| m.role),
            Some(FieldRole::BillingRate)
        );
    }
}
