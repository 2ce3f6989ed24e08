//! Prefecture names and e-Stat area codes, plus request-parameter preparation.

use crate::models::Params;

/// Nationwide aggregate.
pub const NATIONWIDE: &str = "00000";

/// `(name, code)` for the whole country and the 47 prefectures.
pub const PREFECTURES: &[(&str, &str)] = &[
    ("全国", NATIONWIDE),
    ("北海道", "01"),
    ("青森県", "02"),
    ("岩手県", "03"),
    ("宮城県", "04"),
    ("秋田県", "05"),
    ("山形県", "06"),
    ("福島県", "07"),
    ("茨城県", "08"),
    ("栃木県", "09"),
    ("群馬県", "10"),
    ("埼玉県", "11"),
    ("千葉県", "12"),
    ("東京都", "13"),
    ("神奈川県", "14"),
    ("新潟県", "15"),
    ("富山県", "16"),
    ("石川県", "17"),
    ("福井県", "18"),
    ("山梨県", "19"),
    ("長野県", "20"),
    ("岐阜県", "21"),
    ("静岡県", "22"),
    ("愛知県", "23"),
    ("三重県", "24"),
    ("滋賀県", "25"),
    ("京都府", "26"),
    ("大阪府", "27"),
    ("兵庫県", "28"),
    ("奈良県", "29"),
    ("和歌山県", "30"),
    ("鳥取県", "31"),
    ("島根県", "32"),
    ("岡山県", "33"),
    ("広島県", "34"),
    ("山口県", "35"),
    ("徳島県", "36"),
    ("香川県", "37"),
    ("愛媛県", "38"),
    ("高知県", "39"),
    ("福岡県", "40"),
    ("佐賀県", "41"),
    ("長崎県", "42"),
    ("熊本県", "43"),
    ("大分県", "44"),
    ("宮崎県", "45"),
    ("鹿児島県", "46"),
    ("沖縄県", "47"),
];

/// Area code for a prefecture name, or the input itself if it already is a
/// known code.
pub fn area_code(name_or_code: &str) -> Option<&'static str> {
    let s = name_or_code.trim();
    PREFECTURES
        .iter()
        .find(|(name, code)| *name == s || *code == s)
        .map(|(_, code)| *code)
}

pub fn area_name(code: &str) -> Option<&'static str> {
    let code = code.trim();
    PREFECTURES
        .iter()
        .find(|(_, c)| *c == code)
        .map(|(name, _)| *name)
}

/// Table defaults plus `time = "START-END"` and, if given, `cdArea`.
pub fn prepare_params(defaults: &Params, period: (i32, i32), area: Option<&str>) -> Params {
    let (start, end) = if period.0 <= period.1 {
        period
    } else {
        (period.1, period.0)
    };
    let mut params = defaults.clone();
    params.insert("time".into(), format!("{}-{}", start, end));
    if let Some(code) = area.map(str::trim).filter(|c| !c.is_empty()) {
        params.insert("cdArea".into(), code.to_string());
    }
    params
}
