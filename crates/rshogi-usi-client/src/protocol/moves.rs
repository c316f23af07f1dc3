//! USI 指し手文字列の字句チェック（合法性は見ない）。

/// PV の終端として現れうる特殊トークン。
pub const PV_SENTINELS: [&str; 6] = ["win", "rep_win", "rep_lose", "rep_draw", "rep_sup", "rep_inf"];

pub fn is_pv_sentinel(token: &str) -> bool {
    PV_SENTINELS.contains(&token)
}

fn is_file(b: u8) -> bool {
    (b'1'..=b'9').contains(&b)
}

fn is_rank(b: u8) -> bool {
    (b'a'..=b'i').contains(&b)
}

/// `7g7f` / `8h2b+` / `P*5e` 形式なら true。
pub fn is_usi_move(token: &str) -> bool {
    let b = token.as_bytes();
    match b.len() {
        4 if b[1] == b'*' => b"PLNSGBR".contains(&b[0]) && is_file(b[2]) && is_rank(b[3]),
        4 => is_file(b[0]) && is_rank(b[1]) && is_file(b[2]) && is_rank(b[3]),
        5 => is_file(b[0]) && is_rank(b[1]) && is_file(b[2]) && is_rank(b[3]) && b[4] == b'+',
        _ => false,
    }
}
