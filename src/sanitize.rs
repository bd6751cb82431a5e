//! Reduces arbitrary Unicode to what a WinAnsi-encoded simple font can show.
//!
//! Every string is passed through [`sanitize`] before it is measured or drawn,
//! so width tables and content streams only ever see representable characters.

use crate::fonts::char_to_winansi;

/// Transliterate, normalize punctuation, and blank out anything the output
/// encoding cannot carry. Never fails; applying it twice changes nothing.
pub fn sanitize(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        if let Some(latin) = transliterate(ch) {
            out.push_str(latin);
        } else if let Some(plain) = normalize_punctuation(ch) {
            out.push_str(plain);
        } else if ch == '\n' || ch == '\t' || is_representable(ch) {
            out.push(ch);
        } else {
            out.push(' ');
        }
    }
    out
}

/// Printable in WinAnsi: no C0/C1 controls, no DEL.
pub(crate) fn is_representable(ch: char) -> bool {
    let byte = char_to_winansi(ch);
    byte >= 0x20 && byte != 0x7F
}

fn transliterate(ch: char) -> Option<&'static str> {
    let latin = match ch {
        'А' => "A",
        'Б' => "B",
        'В' => "V",
        'Г' => "G",
        'Д' => "D",
        'Е' | 'Ё' | 'Э' => "E",
        'Ж' => "Zh",
        'З' => "Z",
        'И' => "I",
        'Й' | 'Ы' => "Y",
        'К' => "K",
        'Л' => "L",
        'М' => "M",
        'Н' => "N",
        'О' => "O",
        'П' => "P",
        'Р' => "R",
        'С' => "S",
        'Т' => "T",
        'У' => "U",
        'Ф' => "F",
        'Х' => "Kh",
        'Ц' => "Ts",
        'Ч' => "Ch",
        'Ш' => "Sh",
        'Щ' => "Shch",
        'Ю' => "Yu",
        'Я' => "Ya",
        'а' => "a",
        'б' => "b",
        'в' => "v",
        'г' => "g",
        'д' => "d",
        'е' | 'ё' | 'э' => "e",
        'ж' => "zh",
        'з' => "z",
        'и' => "i",
        'й' | 'ы' => "y",
        'к' => "k",
        'л' => "l",
        'м' => "m",
        'н' => "n",
        'о' => "o",
        'п' => "p",
        'р' => "r",
        'с' => "s",
        'т' => "t",
        'у' => "u",
        'ф' => "f",
        'х' => "kh",
        'ц' => "ts",
        'ч' => "ch",
        'ш' => "sh",
        'щ' => "shch",
        'ю' => "yu",
        'я' => "ya",
        // hard and soft signs are not pronounced
        'Ъ' | 'Ь' | 'ъ' | 'ь' => "",
        _ => return None,
    };
    Some(latin)
}

fn normalize_punctuation(ch: char) -> Option<&'static str> {
    let plain = match ch {
        '\u{2010}' | '\u{2011}' | '\u{2012}' | '\u{2013}' | '\u{2014}' | '\u{2015}' => "-",
        '\u{2018}' | '\u{2019}' | '\u{201A}' | '\u{201B}' => "'",
        '\u{201C}' | '\u{201D}' | '\u{201E}' | '\u{201F}' => "\"",
        '\u{2026}' => "...",
        '\u{2022}' => "-",
        '\u{00A0}' => " ",
        _ => return None,
    };
    Some(plain)
}
