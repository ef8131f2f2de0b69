// Bytecode-level tests against the headless engine: scripts are assembled
// with the builder below, loaded through an in-memory asset source and run
// to completion, then the memory image is inspected.

use ai5vm::asset::MemSource;
use ai5vm::error::VmError;
use ai5vm::input::Buttons;
use ai5vm::memory::{sysvar16, Memory};
use ai5vm::opcodes::{expr, stmt, PARAM_EXPRESSION, PARAM_STRING};
use ai5vm::vm::VmPointer;
use ai5vm::Engine;
use std::time::Instant;

#[derive(Default)]
struct Asm {
    bytes: Vec<u8>,
}

impl Asm {
    fn new() -> Asm {
        Asm::default()
    }

    fn here(&self) -> u32 {
        self.bytes.len() as u32
    }

    fn op(mut self, b: u8) -> Asm {
        self.bytes.push(b);
        self
    }

    fn byte(mut self, b: u8) -> Asm {
        self.bytes.push(b);
        self
    }

    fn word(mut self, w: u16) -> Asm {
        self.bytes.extend_from_slice(&w.to_le_bytes());
        self
    }

    fn dword(mut self, d: u32) -> Asm {
        self.bytes.extend_from_slice(&d.to_le_bytes());
        self
    }

    // reserve a dword target to be patched later
    fn dword_mark(mut self) -> (Asm, usize) {
        let at = self.bytes.len();
        self.bytes.extend_from_slice(&[0; 4]);
        (self, at)
    }

    fn patch_dword(mut self, at: usize, d: u32) -> Asm {
        self.bytes[at..at + 4].copy_from_slice(&d.to_le_bytes());
        self
    }

    // expression stream: immediate below 0x80 encodes itself
    fn imm(mut self, v: u8) -> Asm {
        assert!(v < 0x80);
        self.bytes.push(v);
        self
    }

    fn imm16(mut self, v: u16) -> Asm {
        self.bytes.push(expr::IMM16);
        self.bytes.extend_from_slice(&v.to_le_bytes());
        self
    }

    fn imm32(mut self, v: u32) -> Asm {
        self.bytes.push(expr::IMM32);
        self.bytes.extend_from_slice(&v.to_le_bytes());
        self
    }

    fn expr_end(mut self) -> Asm {
        self.bytes.push(expr::END);
        self
    }

    fn str_param(mut self, s: &str) -> Asm {
        self.bytes.push(PARAM_STRING);
        self.bytes.extend_from_slice(s.as_bytes());
        self.bytes.push(0);
        self
    }

    fn params_end(mut self) -> Asm {
        self.bytes.push(0);
        self
    }

    fn build(self) -> Vec<u8> {
        self.bytes
    }
}

fn engine(title: &str, files: &[(&str, Vec<u8>)]) -> (Engine, tempfile::TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let mut source = MemSource::new();
    for (name, data) in files {
        source.insert(name, data.clone());
    }
    let engine = Engine::headless(title, Box::new(source), dir.path().to_path_buf()).unwrap();
    (engine, dir)
}

fn run(title: &str, files: &[(&str, Vec<u8>)]) -> Engine {
    let (mut engine, _dir) = engine(title, files);
    engine.run("START.MES", false).unwrap();
    engine
}

// layout mirror for computing addresses in assembled scripts
fn yuno_memory() -> Memory {
    Memory::new(4096, 8192)
}

#[test]
fn expression_sum() {
    // var16[0] = 3 + 4
    let mes = Asm::new()
        .op(stmt::SETV)
        .byte(0)
        .imm(3)
        .imm(4)
        .byte(expr::PLUS)
        .expr_end()
        .byte(0)
        .op(stmt::END)
        .build();
    let engine = run("yuno", &[("START.MES", mes)]);
    assert_eq!(engine.vm.mem.get_var16(0).unwrap(), 7);
    assert_eq!(engine.vm.stack_depth(), 0);
    assert_eq!(engine.vm.scope_counter(), 0);
}

#[test]
fn setv_truncates_to_u16() {
    let mes = Asm::new()
        .op(stmt::SETV)
        .byte(0)
        .imm32(0x12345678)
        .expr_end()
        .byte(0)
        .op(stmt::END)
        .build();
    let engine = run("yuno", &[("START.MES", mes)]);
    assert_eq!(engine.vm.mem.get_var16(0).unwrap(), 0x5678);
}

#[test]
fn arithmetic_and_comparison_operators() {
    // var16[0] = (10 - 3) * 4 = 28; var16[1] = (5 < 6); var16[2] = 9 % 4
    let mes = Asm::new()
        .op(stmt::SETV)
        .byte(0)
        .imm(10)
        .imm(3)
        .byte(expr::MINUS)
        .imm(4)
        .byte(expr::MUL)
        .expr_end()
        .byte(1) // non-zero separator continues the list at var16[1]
        .imm(5)
        .imm(6)
        .byte(expr::LT)
        .expr_end()
        .byte(1)
        .imm(9)
        .imm(4)
        .byte(expr::MOD)
        .expr_end()
        .byte(0)
        .op(stmt::END)
        .build();
    let engine = run("yuno", &[("START.MES", mes)]);
    assert_eq!(engine.vm.mem.get_var16(0).unwrap(), 28);
    assert_eq!(engine.vm.mem.get_var16(1).unwrap(), 1);
    assert_eq!(engine.vm.mem.get_var16(2).unwrap(), 1);
}

#[test]
fn division_by_zero_is_fatal() {
    let mes = Asm::new()
        .op(stmt::SETV)
        .byte(0)
        .imm(5)
        .imm(0)
        .byte(expr::DIV)
        .expr_end()
        .byte(0)
        .op(stmt::END)
        .build();
    let (mut engine, _dir) = engine("yuno", &[("START.MES", mes)]);
    match engine.run("START.MES", false) {
        Err(VmError::DivideByZero) => {}
        other => panic!("expected divide-by-zero, got {:?}", other.err()),
    }
}

#[test]
fn dirty_stack_at_expression_end_is_fatal() {
    let mes = Asm::new()
        .op(stmt::SETV)
        .byte(0)
        .imm(1)
        .imm(2)
        .expr_end()
        .byte(0)
        .op(stmt::END)
        .build();
    let (mut engine, _dir) = engine("yuno", &[("START.MES", mes)]);
    match engine.run("START.MES", false) {
        Err(VmError::DirtyStack) => {}
        other => panic!("expected dirty stack, got {:?}", other.err()),
    }
}

#[test]
fn rand_stays_in_range() {
    let mes = Asm::new()
        .op(stmt::SETV)
        .byte(0)
        .imm(10)
        .byte(expr::RAND)
        .expr_end()
        .byte(0)
        .op(stmt::END)
        .build();
    for _ in 0..8 {
        let engine = run("yuno", &[("START.MES", mes.clone())]);
        assert!(engine.vm.mem.get_var16(0).unwrap() < 10);
    }
}

#[test]
fn nibble_bank_writes() {
    // SETRBC 5: 0x13, 0x1f, 0xfe -> var4[5..8] = {3, f, e}
    let mes = Asm::new()
        .op(stmt::SETRBC)
        .word(5)
        .imm(0x13)
        .expr_end()
        .byte(1)
        .imm(0x1f)
        .expr_end()
        .byte(1)
        .imm16(0xfe)
        .expr_end()
        .byte(0)
        .op(stmt::END)
        .build();
    let engine = run("yuno", &[("START.MES", mes)]);
    assert_eq!(engine.vm.mem.get_var4(5).unwrap(), 0x3);
    assert_eq!(engine.vm.mem.get_var4(6).unwrap(), 0xf);
    assert_eq!(engine.vm.mem.get_var4(7).unwrap(), 0xe);
    assert_eq!(engine.vm.mem.get_var4(8).unwrap(), 0);
}

#[test]
fn var4_reads_through_reg_operators() {
    // var4[3] = 9, then read it back via REG16 and via REG8
    let mes = Asm::new()
        .op(stmt::SETRBC)
        .word(3)
        .imm(9)
        .expr_end()
        .byte(0)
        .op(stmt::SETV)
        .byte(0)
        .byte(expr::REG16)
        .word(3)
        .expr_end()
        .byte(1)
        .imm(3)
        .byte(expr::REG8)
        .expr_end()
        .byte(0)
        .op(stmt::END)
        .build();
    let engine = run("yuno", &[("START.MES", mes)]);
    assert_eq!(engine.vm.mem.get_var16(0).unwrap(), 9);
    assert_eq!(engine.vm.mem.get_var16(1).unwrap(), 9);
}

#[test]
fn jz_jumps_unless_condition_is_one() {
    fn build(cond: u8) -> Vec<u8> {
        let asm = Asm::new().op(stmt::JZ).imm(cond).expr_end();
        let (asm, target) = asm.dword_mark();
        // fallthrough: var16[1] = 9
        let asm = asm
            .op(stmt::SETV)
            .byte(1)
            .imm(9)
            .expr_end()
            .byte(0)
            .op(stmt::END);
        let t = asm.here();
        // jump target: var16[1] = 5
        asm.patch_dword(target, t)
            .op(stmt::SETV)
            .byte(1)
            .imm(5)
            .expr_end()
            .byte(0)
            .op(stmt::END)
            .build()
    }
    let engine = run("yuno", &[("START.MES", build(0))]);
    assert_eq!(engine.vm.mem.get_var16(1).unwrap(), 5);
    let engine = run("yuno", &[("START.MES", build(1))]);
    assert_eq!(engine.vm.mem.get_var16(1).unwrap(), 9);
}

#[test]
fn jmp_reads_target_in_place() {
    let asm = Asm::new().op(stmt::JMP);
    let (asm, target) = asm.dword_mark();
    let asm = asm
        .op(stmt::SETV)
        .byte(0)
        .imm(1)
        .expr_end()
        .byte(0)
        .op(stmt::END);
    let t = asm.here();
    let mes = asm
        .patch_dword(target, t)
        .op(stmt::SETV)
        .byte(0)
        .imm(2)
        .expr_end()
        .byte(0)
        .op(stmt::END)
        .build();
    let engine = run("yuno", &[("START.MES", mes)]);
    assert_eq!(engine.vm.mem.get_var16(0).unwrap(), 2);
}

#[test]
fn goto_chain_keeps_call_depth() {
    let a = Asm::new()
        .op(stmt::GOTO)
        .str_param("B.MES")
        .params_end()
        .op(stmt::END)
        .build();
    let b = Asm::new()
        .op(stmt::GOTO)
        .str_param("C.MES")
        .params_end()
        .op(stmt::END)
        .build();
    let c = Asm::new()
        .op(stmt::SETV)
        .byte(3)
        .imm(1)
        .expr_end()
        .byte(0)
        .op(stmt::END)
        .build();
    let engine = run("yuno", &[("START.MES", a), ("B.MES", b), ("C.MES", c)]);
    assert_eq!(engine.vm.mem.get_var16(3).unwrap(), 1);
    assert_eq!(engine.vm.mem.mes_name(), "C.MES");
    assert_eq!(engine.vm.call_depth(), 0);
}

// PROCD lays the body inline behind a skip target; PROC runs it and returns
// to the statement after the call.
fn procd_body_setv(asm: Asm, proc_no: u8, var: u8, value: u8) -> Asm {
    let asm = asm.op(stmt::PROCD).imm(proc_no).expr_end();
    let (asm, target) = asm.dword_mark();
    let asm = asm
        .op(stmt::SETV)
        .byte(var)
        .imm(value)
        .expr_end()
        .byte(0)
        .op(stmt::END);
    let t = asm.here();
    asm.patch_dword(target, t)
}

#[test]
fn procd_then_proc_runs_the_body_and_returns() {
    let asm = procd_body_setv(Asm::new(), 7, 2, 0x11);
    let mes = asm
        .op(stmt::PROC)
        .byte(PARAM_EXPRESSION)
        .imm(7)
        .expr_end()
        .params_end()
        // proves ip was restored after the procedure returned
        .op(stmt::SETV)
        .byte(4)
        .imm(1)
        .expr_end()
        .byte(0)
        .op(stmt::END)
        .build();
    let engine = run("yuno", &[("START.MES", mes)]);
    assert_eq!(engine.vm.mem.get_var16(2).unwrap(), 0x11);
    assert_eq!(engine.vm.mem.get_var16(4).unwrap(), 1);
}

#[test]
fn undefined_procedure_is_fatal() {
    let mes = Asm::new()
        .op(stmt::PROC)
        .byte(PARAM_EXPRESSION)
        .imm(9)
        .expr_end()
        .params_end()
        .op(stmt::END)
        .build();
    let (mut engine, _dir) = engine("yuno", &[("START.MES", mes)]);
    match engine.run("START.MES", false) {
        Err(VmError::UndefinedProcedure(9)) => {}
        other => panic!("expected undefined procedure, got {:?}", other.err()),
    }
}

#[test]
fn call_restores_ip_name_and_procedures() {
    // yuno sets call_saves_procedures: the callee redefines procedure 7, but
    // the caller's definition must win after the call returns.
    let asm = procd_body_setv(Asm::new(), 7, 2, 0x11);
    let a = asm
        .op(stmt::CALL)
        .str_param("B.MES")
        .params_end()
        .op(stmt::PROC)
        .byte(PARAM_EXPRESSION)
        .imm(7)
        .expr_end()
        .params_end()
        .op(stmt::END)
        .build();
    let b = procd_body_setv(Asm::new(), 7, 2, 0x22).op(stmt::END).build();
    let engine = run("yuno", &[("START.MES", a), ("B.MES", b)]);
    assert_eq!(engine.vm.mem.get_var16(2).unwrap(), 0x11);
    assert_eq!(engine.vm.mem.mes_name(), "START.MES");
    assert_eq!(engine.vm.call_depth(), 0);
}

#[test]
fn goto_inside_call_unwinds_to_the_top() {
    let a = Asm::new()
        .op(stmt::CALL)
        .str_param("B.MES")
        .params_end()
        // must never run: the callee GOTOs away
        .op(stmt::SETV)
        .byte(6)
        .imm(1)
        .expr_end()
        .byte(0)
        .op(stmt::END)
        .build();
    let b = Asm::new()
        .op(stmt::GOTO)
        .str_param("C.MES")
        .params_end()
        .op(stmt::END)
        .build();
    let c = Asm::new()
        .op(stmt::SETV)
        .byte(7)
        .imm(2)
        .expr_end()
        .byte(0)
        .op(stmt::END)
        .build();
    let engine = run("yuno", &[("START.MES", a), ("B.MES", b), ("C.MES", c)]);
    assert_eq!(engine.vm.mem.get_var16(6).unwrap(), 0);
    assert_eq!(engine.vm.mem.get_var16(7).unwrap(), 2);
    assert_eq!(engine.vm.call_depth(), 0);
}

#[test]
fn seta_at_writes_through_var16_pointer() {
    let mem = yuno_memory();
    let target = (mem.file_data_off() + 0x2000) as u16;
    let mes = Asm::new()
        // var16[0] = target
        .op(stmt::SETV)
        .byte(0)
        .imm16(target)
        .expr_end()
        .byte(0)
        // SETA@ i=0 var=1 (base from var16[0]): 0xabcd, 0x1234
        .op(stmt::SETA_AT)
        .imm(0)
        .expr_end()
        .byte(1)
        .imm16(0xabcd)
        .expr_end()
        .byte(1)
        .imm16(0x1234)
        .expr_end()
        .byte(0)
        .op(stmt::END)
        .build();
    let engine = run("yuno", &[("START.MES", mes)]);
    assert_eq!(engine.vm.mem.read_u16(target as usize).unwrap(), 0xabcd);
    assert_eq!(engine.vm.mem.read_u16(target as usize + 2).unwrap(), 0x1234);
}

#[test]
fn setab_and_array32_indirection() {
    let mem = yuno_memory();
    let target = (mem.file_data_off() + 0x3000) as u32;
    let mes = Asm::new()
        // var32[0] = target
        .op(stmt::SETRD)
        .byte(0)
        .imm32(target)
        .expr_end()
        .byte(0)
        // SETAB i=0 var=1 (base from var32[0]): byte 0x5a
        .op(stmt::SETAB)
        .imm(0)
        .expr_end()
        .byte(1)
        .imm(0x5a)
        .expr_end()
        .byte(0)
        // read back through ARRAY32_GET8 into var16[0]
        .op(stmt::SETV)
        .byte(0)
        .imm(0)
        .byte(expr::ARRAY32_GET8)
        .byte(1)
        .expr_end()
        .byte(0)
        .op(stmt::END)
        .build();
    let engine = run("yuno", &[("START.MES", mes)]);
    assert_eq!(engine.vm.mem.read_u8(target as usize).unwrap(), 0x5a);
    assert_eq!(engine.vm.mem.get_var16(0).unwrap(), 0x5a);
}

#[test]
fn farcall_outside_file_data_is_fatal() {
    let mes = Asm::new()
        .op(stmt::SYS)
        .imm(13)
        .expr_end()
        .byte(PARAM_EXPRESSION)
        .imm(0)
        .expr_end()
        .params_end()
        .op(stmt::END)
        .build();
    let (mut engine, _dir) = engine("yuno", &[("START.MES", mes)]);
    match engine.run("START.MES", false) {
        Err(VmError::InvalidFarcall(0)) => {}
        other => panic!("expected invalid farcall, got {:?}", other.err()),
    }
}

#[test]
fn farcall_into_file_data_executes_and_returns() {
    let mem = yuno_memory();
    // callee at file_data+0x4000: var16[9] = 3, then END
    let callee_off = 0x4000u32;
    let callee_abs = mem.file_data_off() as u32 + callee_off;
    let callee = Asm::new()
        .op(stmt::SETV)
        .byte(9)
        .imm(3)
        .expr_end()
        .byte(0)
        .op(stmt::END)
        .build();
    let mes = Asm::new()
        // read the callee bytes into place first
        .op(stmt::SYS)
        .imm(7)
        .expr_end()
        .byte(PARAM_EXPRESSION)
        .imm(0)
        .expr_end()
        .str_param("CALLEE.BIN")
        .byte(PARAM_EXPRESSION)
        .imm32(callee_off)
        .expr_end()
        .params_end()
        .op(stmt::SYS)
        .imm(13)
        .expr_end()
        .byte(PARAM_EXPRESSION)
        .imm32(callee_abs)
        .expr_end()
        .params_end()
        .op(stmt::SETV)
        .byte(10)
        .imm(1)
        .expr_end()
        .byte(0)
        .op(stmt::END)
        .build();
    let engine = run(
        "yuno",
        &[("START.MES", mes), ("CALLEE.BIN", callee)],
    );
    assert_eq!(engine.vm.mem.get_var16(9).unwrap(), 3);
    assert_eq!(engine.vm.mem.get_var16(10).unwrap(), 1);
}

#[test]
fn timed_wait_is_cancelled_by_shift() {
    let mes = Asm::new()
        .op(stmt::SYS)
        .imm(11)
        .expr_end()
        .byte(PARAM_EXPRESSION)
        .imm16(1000)
        .expr_end()
        .params_end()
        .op(stmt::END)
        .build();
    let (mut engine, _dir) = engine("yuno", &[("START.MES", mes)]);
    engine.vm.input.script_held(Buttons::SHIFT);
    let start = Instant::now();
    engine.run("START.MES", false).unwrap();
    assert!(start.elapsed().as_millis() < 500);
}

#[test]
fn check_cursor_pos_walks_the_rect_table() {
    // the rect table is embedded in the MES image itself
    let asm = Asm::new()
        .op(stmt::SYS)
        .imm(14)
        .expr_end()
        .byte(PARAM_EXPRESSION)
        .imm(50)
        .expr_end()
        .byte(PARAM_EXPRESSION)
        .imm(50)
        .expr_end()
        .byte(PARAM_EXPRESSION);
    // the table sits right behind the END statement; assemble the tail first
    // to learn its offset
    let mut tail = Asm::new()
        .expr_end()
        .params_end()
        .op(stmt::END)
        .build();
    let table_off = asm.here() + 3 /* imm16 marker + value */ + tail.len() as u32;
    let mut bytes = asm.imm16(table_off as u16).build();
    bytes.append(&mut tail);
    // entry: id=7, rect (40,40)-(60,60); then end sentinel
    for w in [7u16, 40, 40, 60, 60, 0xffff].iter() {
        bytes.extend_from_slice(&w.to_le_bytes());
    }
    let engine = run("yuno", &[("START.MES", bytes)]);
    assert_eq!(engine.vm.mem.get_var16(18).unwrap(), 7);
}

#[test]
fn check_cursor_pos_misses_to_sentinel() {
    let asm = Asm::new()
        .op(stmt::SYS)
        .imm(14)
        .expr_end()
        .byte(PARAM_EXPRESSION)
        .imm(5)
        .expr_end()
        .byte(PARAM_EXPRESSION)
        .imm(5)
        .expr_end()
        .byte(PARAM_EXPRESSION);
    let mut tail = Asm::new().expr_end().params_end().op(stmt::END).build();
    let table_off = asm.here() + 3 + tail.len() as u32;
    let mut bytes = asm.imm16(table_off as u16).build();
    bytes.append(&mut tail);
    for w in [7u16, 40, 40, 60, 60, 0xffff].iter() {
        bytes.extend_from_slice(&w.to_le_bytes());
    }
    let engine = run("yuno", &[("START.MES", bytes)]);
    assert_eq!(engine.vm.mem.get_var16(18).unwrap(), 0xffff);
}

#[test]
fn savedata_var4_round_trip_through_syscalls() {
    // var4[0]=7; save slot 1; var4[0]=2; load slot 1
    let mes = Asm::new()
        .op(stmt::SETRBC)
        .word(0)
        .imm(7)
        .expr_end()
        .byte(0)
        .op(stmt::SYS)
        .imm(4)
        .expr_end()
        .byte(PARAM_EXPRESSION)
        .imm(5) // save_var4
        .expr_end()
        .byte(PARAM_EXPRESSION)
        .imm(1)
        .expr_end()
        .params_end()
        .op(stmt::SETRBC)
        .word(0)
        .imm(2)
        .expr_end()
        .byte(0)
        .op(stmt::SYS)
        .imm(4)
        .expr_end()
        .byte(PARAM_EXPRESSION)
        .imm(4) // load_var4
        .expr_end()
        .byte(PARAM_EXPRESSION)
        .imm(1)
        .expr_end()
        .params_end()
        .op(stmt::END)
        .build();
    let (mut engine, dir) = engine("yuno", &[("START.MES", mes)]);
    engine.run("START.MES", false).unwrap();
    assert_eq!(engine.vm.mem.get_var4(0).unwrap(), 7);
    assert!(dir.path().join("FLAG01").exists());
}

#[test]
fn invalid_save_number_is_fatal() {
    let mes = Asm::new()
        .op(stmt::SYS)
        .imm(4)
        .expr_end()
        .byte(PARAM_EXPRESSION)
        .imm(5)
        .expr_end()
        .byte(PARAM_EXPRESSION)
        .imm16(100)
        .expr_end()
        .params_end()
        .op(stmt::END)
        .build();
    let (mut engine, _dir) = engine("yuno", &[("START.MES", mes)]);
    match engine.run("START.MES", false) {
        Err(VmError::InvalidSaveNumber(100)) => {}
        other => panic!("expected invalid save number, got {:?}", other.err()),
    }
}

#[test]
fn unknown_sys_group_is_fatal() {
    let mes = Asm::new()
        .op(stmt::SYS)
        .imm(30)
        .expr_end()
        .params_end()
        .op(stmt::END)
        .build();
    let (mut engine, _dir) = engine("yuno", &[("START.MES", mes)]);
    match engine.run("START.MES", false) {
        Err(VmError::UnknownSysGroup(30)) => {}
        other => panic!("expected unknown sys group, got {:?}", other.err()),
    }
}

#[test]
fn line_statement_feeds_the_text_cursor() {
    let mes = Asm::new()
        .op(stmt::LINE)
        .byte(1) // non-zero separator: no-op
        .op(stmt::LINE)
        .byte(0)
        .op(stmt::END)
        .build();
    let engine = run("yuno", &[("START.MES", mes)]);
    let y = engine.vm.mem.get_sysvar16(sysvar16::TEXT_CURSOR_Y);
    let line_space = engine.vm.mem.get_sysvar16(sysvar16::LINE_SPACE);
    assert_eq!(y, line_space);
    assert_eq!(
        engine.vm.mem.get_sysvar16(sysvar16::TEXT_CURSOR_X),
        engine.vm.mem.get_sysvar16(sysvar16::TEXT_START_X)
    );
}

#[test]
fn unprefixed_text_is_salvaged_as_str() {
    // raw ASCII where a statement opcode belongs: rewound and drawn as text
    let mes = Asm::new()
        .byte(b'A')
        .byte(b'B')
        .byte(0)
        .op(stmt::END)
        .build();
    let engine = run("yuno", &[("START.MES", mes)]);
    // hankaku advance is char_space/16 per character
    assert_eq!(engine.vm.mem.get_sysvar16(sysvar16::TEXT_CURSOR_X), 2);
}

#[test]
fn txt_statement_advances_by_zenkaku_widths() {
    let mes = Asm::new()
        .op(stmt::TXT)
        .byte(0x82)
        .byte(0xa0)
        .byte(0x82)
        .byte(0xa2)
        .byte(0)
        .op(stmt::END)
        .build();
    let engine = run("yuno", &[("START.MES", mes)]);
    // zenkaku advance is char_space/8 per character
    assert_eq!(engine.vm.mem.get_sysvar16(sysvar16::TEXT_CURSOR_X), 4);
}

#[test]
fn menui_registers_and_menu_pick_finds_it() {
    let asm = Asm::new()
        .op(stmt::MENUI)
        .byte(PARAM_EXPRESSION)
        .imm(3)
        .expr_end()
        .params_end();
    let (asm, target) = asm.dword_mark();
    let body = asm.here();
    // entry body (never picked here)
    let asm = asm
        .op(stmt::SETV)
        .byte(5)
        .imm(9)
        .expr_end()
        .byte(0)
        .op(stmt::END);
    let t = asm.here();
    let mes = asm
        .patch_dword(target, t)
        .op(stmt::SYS)
        .imm(15)
        .expr_end()
        .byte(PARAM_EXPRESSION)
        .imm(3)
        .expr_end()
        .params_end()
        .op(stmt::END)
        .build();
    let engine = run("yuno", &[("START.MES", mes)]);
    // entry 3 is the first registered entry
    assert_eq!(engine.vm.mem.get_var16(18).unwrap(), 0);
    assert_eq!(engine.vm.mem.get_var16(5).unwrap(), 0);
    let addr = engine
        .vm
        .mem
        .read_u32(engine.vm.mem.menu_entry_addresses_off())
        .unwrap();
    assert_eq!(addr, body);
    let no = engine
        .vm
        .mem
        .read_u32(engine.vm.mem.menu_entry_numbers_off())
        .unwrap();
    assert_eq!(no, 3);
}

#[test]
fn procedure_pointers_stay_inside_the_image() {
    let asm = procd_body_setv(Asm::new(), 0, 0, 1);
    let mes = asm.op(stmt::END).build();
    let engine = run("yuno", &[("START.MES", mes)]);
    for proc in engine.vm.procedures.iter().flatten() {
        let VmPointer { code, ptr } = *proc;
        assert!((code as usize + ptr as usize) < engine.vm.mem.len());
    }
    assert!(engine.vm.procedures[0].is_some());
}
