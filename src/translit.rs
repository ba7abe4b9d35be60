//! IAST → Ukrainian Cyrillic transliteration.
//!
//! Longest match wins: three-character clusters are tried before digraphs,
//! digraphs before single letters. Anything without a mapping (spaces,
//! hyphens, punctuation) passes through unchanged.

const PATTERNS: &[(&str, &str)] = &[
    ("kṣa", "кша"),
    ("kṣe", "кше"),
    ("kṣi", "кші"),
    ("kṣu", "кшу"),
    ("Kṣa", "Кша"),
    ("Kṣe", "Кше"),
    ("Kṣi", "Кші"),
    ("Kṣu", "Кшу"),
    ("nya", "нйа"),
    ("nye", "нйе"),
    ("nyi", "нйі"),
    ("nyo", "нйо"),
    ("nyu", "нйу"),
    ("bh", "бг"),
    ("gh", "ґг"),
    ("dh", "дг"),
    ("th", "тх"),
    ("ph", "пх"),
    ("kh", "кх"),
    ("ch", "чх"),
    ("jh", "джх"),
    ("sh", "сх"),
    ("Bh", "Бг"),
    ("Gh", "Ґг"),
    ("Dh", "Дг"),
    ("Th", "Тх"),
    ("Ph", "Пх"),
    ("Kh", "Кх"),
    ("Ch", "Чх"),
    ("Jh", "Джх"),
    ("Sh", "Сх"),
    ("kṣ", "кш"),
    ("jñ", "джн̃"),
    ("ai", "аі"),
    ("au", "ау"),
    ("ṣ", "ш"),
    ("ś", "ш́"),
    ("ṭ", "т̣"),
    ("ḍ", "д̣"),
    ("ṇ", "н̣"),
    ("ṛ", "р̣"),
    ("ñ", "н̃"),
    ("ṅ", "н̇"),
    ("ṁ", "м̇"),
    ("ḥ", "х̣"),
    ("Ṣ", "Ш"),
    ("Ś", "Ш́"),
    ("Ṭ", "Т̣"),
    ("Ḍ", "Д̣"),
    ("Ṇ", "Н̣"),
    ("Ṛ", "Р̣"),
    ("Ñ", "Н̃"),
    ("Ṅ", "Н̇"),
    ("Ṁ", "М̇"),
    ("Ḥ", "Х̣"),
    ("ā", "а\u{0304}"),
    ("ī", "\u{0131}\u{0304}"),
    ("ū", "у\u{0304}"),
    ("ṝ", "р̣\u{0304}"),
    ("Ā", "А\u{0304}"),
    ("Ī", "І\u{0304}"),
    ("Ū", "У\u{0304}"),
    ("Ṝ", "Р̣\u{0304}"),
    ("k", "к"),
    ("g", "ґ"),
    ("c", "ч"),
    ("j", "дж"),
    ("t", "т"),
    ("d", "д"),
    ("p", "п"),
    ("b", "б"),
    ("y", "й"),
    ("r", "р"),
    ("l", "л"),
    ("v", "в"),
    ("w", "в"),
    ("h", "х"),
    ("m", "м"),
    ("n", "н"),
    ("s", "с"),
    ("K", "К"),
    ("G", "Ґ"),
    ("C", "Ч"),
    ("J", "Дж"),
    ("T", "Т"),
    ("D", "Д"),
    ("P", "П"),
    ("B", "Б"),
    ("Y", "Й"),
    ("R", "Р"),
    ("L", "Л"),
    ("V", "В"),
    ("W", "В"),
    ("H", "Х"),
    ("M", "М"),
    ("N", "Н"),
    ("S", "С"),
    ("a", "а"),
    ("i", "і"),
    ("u", "у"),
    ("e", "е"),
    ("o", "о"),
    ("A", "А"),
    ("I", "І"),
    ("U", "У"),
    ("E", "Е"),
    ("O", "О"),
];

pub fn iast_to_ukrainian(iast: &str) -> String {
    let chars: Vec<char> = iast.chars().collect();
    let mut out = String::with_capacity(iast.len() * 2);
    let mut i = 0;

    'outer: while i < chars.len() {
        for len in [3_usize, 2, 1] {
            if i + len > chars.len() {
                continue;
            }
            let candidate: String = chars[i..i + len].iter().collect();
            if let Some((_, cyrillic)) = PATTERNS.iter().find(|(latin, _)| *latin == candidate) {
                out.push_str(cyrillic);
                i += len;
                continue 'outer;
            }
        }
        out.push(chars[i]);
        i += 1;
    }

    out
}
