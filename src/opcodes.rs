// Opcode byte translation. MES dialects map raw bytes onto statement and
// expression kinds through two fixed tables; immediates below 0x80 encode
// themselves. Bytes outside the statement table fall back to INVALID, which
// the interpreter salvages as inline text.

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum StatementOp {
    End,
    Txt,
    Str,
    Setrbc,
    Setv,
    Setrbe,
    Setac,
    SetaAt,
    Setad,
    Setaw,
    Setab,
    Jz,
    Jmp,
    Sys,
    Goto,
    Call,
    Menui,
    Proc,
    Util,
    Line,
    Procd,
    Menus,
    Setrd,
    Invalid,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ExprOp {
    Imm(u8),
    Var,
    Array16Get16,
    Array16Get8,
    Plus,
    Minus,
    Mul,
    Div,
    Mod,
    Rand,
    And,
    Or,
    BitAnd,
    BitIor,
    BitXor,
    Lt,
    Gt,
    Lte,
    Gte,
    Eq,
    Neq,
    Imm16,
    Imm32,
    Reg16,
    Reg8,
    Array32Get32,
    Array32Get16,
    Array32Get8,
    Var32,
    End,
}

// Statement opcode bytes of the stock AI5WIN dialect.
pub mod stmt {
    pub const END: u8 = 0x00;
    pub const TXT: u8 = 0x01;
    pub const STR: u8 = 0x02;
    pub const SETRBC: u8 = 0x03;
    pub const SETV: u8 = 0x04;
    pub const SETRBE: u8 = 0x05;
    pub const SETAC: u8 = 0x06;
    pub const SETA_AT: u8 = 0x07;
    pub const SETAD: u8 = 0x08;
    pub const SETAW: u8 = 0x09;
    pub const SETAB: u8 = 0x0a;
    pub const JZ: u8 = 0x0b;
    pub const JMP: u8 = 0x0c;
    pub const SYS: u8 = 0x0d;
    pub const GOTO: u8 = 0x0e;
    pub const CALL: u8 = 0x0f;
    pub const MENUI: u8 = 0x10;
    pub const PROC: u8 = 0x11;
    pub const UTIL: u8 = 0x12;
    pub const LINE: u8 = 0x13;
    pub const PROCD: u8 = 0x14;
    pub const MENUS: u8 = 0x15;
    pub const SETRD: u8 = 0x16;
}

// Expression opcode bytes of the stock AI5WIN dialect. 0x00..=0x7f are
// immediates and encode their own value.
pub mod expr {
    pub const VAR: u8 = 0x80;
    pub const ARRAY16_GET16: u8 = 0x81;
    pub const ARRAY16_GET8: u8 = 0x82;
    pub const PLUS: u8 = 0x83;
    pub const MINUS: u8 = 0x84;
    pub const MUL: u8 = 0x85;
    pub const DIV: u8 = 0x86;
    pub const MOD: u8 = 0x87;
    pub const RAND: u8 = 0x88;
    pub const AND: u8 = 0x89;
    pub const OR: u8 = 0x8a;
    pub const BITAND: u8 = 0x8b;
    pub const BITIOR: u8 = 0x8c;
    pub const BITXOR: u8 = 0x8d;
    pub const LT: u8 = 0x8e;
    pub const GT: u8 = 0x8f;
    pub const LTE: u8 = 0x90;
    pub const GTE: u8 = 0x91;
    pub const EQ: u8 = 0x92;
    pub const NEQ: u8 = 0x93;
    pub const IMM16: u8 = 0x94;
    pub const IMM32: u8 = 0x95;
    pub const REG16: u8 = 0x96;
    pub const REG8: u8 = 0x97;
    pub const ARRAY32_GET32: u8 = 0x98;
    pub const ARRAY32_GET16: u8 = 0x99;
    pub const ARRAY32_GET8: u8 = 0x9a;
    pub const VAR32: u8 = 0x9b;
    pub const END: u8 = 0xff;
}

// Parameter list tag bytes.
pub const PARAM_END: u8 = 0x00;
pub const PARAM_EXPRESSION: u8 = 0x01;
pub const PARAM_STRING: u8 = 0x02;

#[derive(Copy, Clone)]
pub struct Dialect {
    pub stmt: fn(u8) -> StatementOp,
    pub expr: fn(u8) -> ExprOp,
    // One engine variant reads RAND's range as a 16-bit immediate instead of
    // popping it. None of the shipped titles set this.
    pub rand_reads_imm16: bool,
}

pub fn opcode_to_stmt(op: u8) -> StatementOp {
    match op {
        stmt::END => StatementOp::End,
        stmt::TXT => StatementOp::Txt,
        stmt::STR => StatementOp::Str,
        stmt::SETRBC => StatementOp::Setrbc,
        stmt::SETV => StatementOp::Setv,
        stmt::SETRBE => StatementOp::Setrbe,
        stmt::SETAC => StatementOp::Setac,
        stmt::SETA_AT => StatementOp::SetaAt,
        stmt::SETAD => StatementOp::Setad,
        stmt::SETAW => StatementOp::Setaw,
        stmt::SETAB => StatementOp::Setab,
        stmt::JZ => StatementOp::Jz,
        stmt::JMP => StatementOp::Jmp,
        stmt::SYS => StatementOp::Sys,
        stmt::GOTO => StatementOp::Goto,
        stmt::CALL => StatementOp::Call,
        stmt::MENUI => StatementOp::Menui,
        stmt::PROC => StatementOp::Proc,
        stmt::UTIL => StatementOp::Util,
        stmt::LINE => StatementOp::Line,
        stmt::PROCD => StatementOp::Procd,
        stmt::MENUS => StatementOp::Menus,
        stmt::SETRD => StatementOp::Setrd,
        _ => StatementOp::Invalid,
    }
}

pub fn opcode_to_expr(op: u8) -> ExprOp {
    if op < 0x80 {
        return ExprOp::Imm(op);
    }
    match op {
        expr::VAR => ExprOp::Var,
        expr::ARRAY16_GET16 => ExprOp::Array16Get16,
        expr::ARRAY16_GET8 => ExprOp::Array16Get8,
        expr::PLUS => ExprOp::Plus,
        expr::MINUS => ExprOp::Minus,
        expr::MUL => ExprOp::Mul,
        expr::DIV => ExprOp::Div,
        expr::MOD => ExprOp::Mod,
        expr::RAND => ExprOp::Rand,
        expr::AND => ExprOp::And,
        expr::OR => ExprOp::Or,
        expr::BITAND => ExprOp::BitAnd,
        expr::BITIOR => ExprOp::BitIor,
        expr::BITXOR => ExprOp::BitXor,
        expr::LT => ExprOp::Lt,
        expr::GT => ExprOp::Gt,
        expr::LTE => ExprOp::Lte,
        expr::GTE => ExprOp::Gte,
        expr::EQ => ExprOp::Eq,
        expr::NEQ => ExprOp::Neq,
        expr::IMM16 => ExprOp::Imm16,
        expr::IMM32 => ExprOp::Imm32,
        expr::REG16 => ExprOp::Reg16,
        expr::REG8 => ExprOp::Reg8,
        expr::ARRAY32_GET32 => ExprOp::Array32Get32,
        expr::ARRAY32_GET16 => ExprOp::Array32Get16,
        expr::ARRAY32_GET8 => ExprOp::Array32Get8,
        expr::VAR32 => ExprOp::Var32,
        expr::END => ExprOp::End,
        // Unassigned operator bytes terminate the expression; the stray byte
        // will surface as a dirty-stack error rather than silent misparsing.
        _ => ExprOp::End,
    }
}

pub const AI5WIN_DIALECT: Dialect = Dialect {
    stmt: opcode_to_stmt,
    expr: opcode_to_expr,
    rand_reads_imm16: false,
};

// Shift-JIS lead byte of a two-byte (zenkaku) sequence.
pub fn char_is_zenkaku(c: u8) -> bool {
    (0x81..=0x9f).contains(&c) || (0xe0..=0xfc).contains(&c)
}

// Single-byte (hankaku) character: ASCII or half-width kana.
pub fn char_is_hankaku(c: u8) -> bool {
    c < 0x80 || (0xa1..=0xdf).contains(&c)
}

impl StatementOp {
    pub fn name(&self) -> &'static str {
        match self {
            StatementOp::End => "END",
            StatementOp::Txt => "TXT",
            StatementOp::Str => "STR",
            StatementOp::Setrbc => "SETRBC",
            StatementOp::Setv => "SETV",
            StatementOp::Setrbe => "SETRBE",
            StatementOp::Setac => "SETAC",
            StatementOp::SetaAt => "SETA@",
            StatementOp::Setad => "SETAD",
            StatementOp::Setaw => "SETAW",
            StatementOp::Setab => "SETAB",
            StatementOp::Jz => "JZ",
            StatementOp::Jmp => "JMP",
            StatementOp::Sys => "SYS",
            StatementOp::Goto => "GOTO",
            StatementOp::Call => "CALL",
            StatementOp::Menui => "MENUI",
            StatementOp::Proc => "PROC",
            StatementOp::Util => "UTIL",
            StatementOp::Line => "LINE",
            StatementOp::Procd => "PROCD",
            StatementOp::Menus => "MENUS",
            StatementOp::Setrd => "SETRD",
            StatementOp::Invalid => "INVALID",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statement_table_covers_all_assigned_bytes() {
        for op in 0x00..=0x16u8 {
            assert_ne!(opcode_to_stmt(op), StatementOp::Invalid, "byte {:#x}", op);
        }
        assert_eq!(opcode_to_stmt(0x17), StatementOp::Invalid);
        assert_eq!(opcode_to_stmt(0x82), StatementOp::Invalid);
    }

    #[test]
    fn small_values_are_their_own_immediates() {
        assert_eq!(opcode_to_expr(0x00), ExprOp::Imm(0));
        assert_eq!(opcode_to_expr(0x7f), ExprOp::Imm(0x7f));
        assert_eq!(opcode_to_expr(expr::PLUS), ExprOp::Plus);
        assert_eq!(opcode_to_expr(expr::END), ExprOp::End);
    }

    #[test]
    fn sjis_character_classes() {
        assert!(char_is_zenkaku(0x82));
        assert!(char_is_zenkaku(0xe0));
        assert!(!char_is_zenkaku(0x41));
        assert!(char_is_hankaku(b'A'));
        assert!(char_is_hankaku(0xb1)); // half-width katakana
        assert!(!char_is_hankaku(0x82));
    }
}
