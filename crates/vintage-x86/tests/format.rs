mod common;

use common::decode;
use vintage_x86::Model;

#[track_caller]
fn assert_text(model: Model, bytes: &[u8], expected: &str) {
    let (len, inst) = decode(model, bytes);
    assert_eq!(len, bytes.len(), "{bytes:02x?}");
    assert_eq!(inst.to_string(), expected, "{bytes:02x?}");
}

#[test]
fn register_and_immediate_operands() {
    assert_text(Model::I8086, &[0xb8, 0x34, 0x12], "mov ax, 0x1234");
    assert_text(Model::I8086, &[0xb4, 0x0e], "mov ah, 0xe");
    assert_text(Model::I8086, &[0x01, 0xd8], "add ax, bx");
    assert_text(Model::I8086, &[0x87, 0xd9], "xchg bx, cx");
    assert_text(Model::I8086, &[0x91], "xchg cx, ax");
    assert_text(Model::I8086, &[0x8e, 0xd8], "mov ds, ax");
    assert_text(Model::I8086, &[0x40], "inc ax");
    assert_text(Model::I8086, &[0x50], "push ax");
    assert_text(Model::I8086, &[0x07], "pop es");
    assert_text(Model::I80186, &[0x6a, 0xff], "push 0xffff");
}

#[test]
fn memory_operands() {
    assert_text(Model::I8086, &[0x8b, 0x1e, 0x00, 0x10], "mov bx, word [0x1000]");
    assert_text(Model::I8086, &[0x26, 0x8b, 0x07], "mov ax, word [es:bx]");
    assert_text(Model::I8086, &[0x88, 0x47, 0xfe], "mov byte [bx-0x2], al");
    assert_text(Model::I8086, &[0x8d, 0x42, 0x04], "lea ax, word [bp+si+0x4]");
    assert_text(Model::I8086, &[0xa0, 0x00, 0x20], "mov al, byte [0x2000]");
    assert_text(Model::I8086, &[0xa3, 0x00, 0x20], "mov word [0x2000], ax");
    assert_text(Model::I8086, &[0xff, 0x1f], "callf dword [bx]");
    assert_text(Model::I8086, &[0x3e, 0xa1, 0x00, 0x10], "mov ax, word [ds:0x1000]");
    assert_text(Model::I8086, &[0x2e, 0xff, 0x27], "jmp word [cs:bx]");
}

#[test]
fn shifts_and_ports() {
    assert_text(Model::I8086, &[0xd3, 0xe0], "sal ax, cl");
    assert_text(Model::I8086, &[0xd1, 0xe8], "shr ax, 0x1");
    assert_text(Model::I8086, &[0xec], "in al, dx");
    assert_text(Model::I8086, &[0xef], "out dx, ax");
    assert_text(Model::I8086, &[0xe6, 0x60], "out 0x60, al");
}

#[test]
fn prefixes_and_string_instructions() {
    assert_text(Model::I8086, &[0xa4], "movsb");
    assert_text(Model::I8086, &[0xf3, 0xa5], "rep movsw");
    assert_text(Model::I8086, &[0xf3, 0xa6], "repe cmpsb");
    assert_text(Model::I8086, &[0xf2, 0xae], "repne scasb");
    assert_text(Model::I8086, &[0xf0, 0xfe, 0x07], "lock inc byte [bx]");
}

#[test]
fn control_transfers() {
    assert_text(Model::I8086, &[0x74, 0xfe], "je -0x2");
    assert_text(Model::I8086, &[0xe8, 0x00, 0x01], "call +0x100");
    assert_text(Model::I8086, &[0x9a, 0x78, 0x56, 0x34, 0x12], "callf 0x1234:0x5678");
    assert_text(Model::I8086, &[0xc3], "ret");
    assert_text(Model::I8086, &[0xcd, 0x21], "int 0x21");
}

#[test]
fn implicit_and_special_operands() {
    assert_text(Model::I8086, &[0x27], "daa");
    assert_text(Model::I8086, &[0x98], "cbw");
    assert_text(Model::I8086, &[0xd4, 0x0a], "aam 0xa");
    assert_text(Model::I80186, &[0x6b, 0xc3, 0x05], "imul ax, bx, 0x5");
    assert_text(Model::I8086, &[0xf7, 0xeb], "imul bx");
    assert_text(Model::I80186, &[0xc8, 0x10, 0x00, 0x01], "enter 0x10, 0x1");
}

#[test]
fn same_register_twice_keeps_both_operands() {
    assert_text(Model::I8086, &[0x31, 0xc0], "xor ax, ax");
    assert_text(Model::I8086, &[0x89, 0xc0], "mov ax, ax");
    assert_text(Model::I8086, &[0x85, 0xdb], "test bx, bx");
    assert_text(Model::I8086, &[0x01, 0xc9], "add cx, cx");
    assert_text(Model::I8086, &[0x86, 0xe4], "xchg ah, ah");
    assert_text(Model::I80186, &[0x69, 0xc0, 0x00, 0x00], "imul ax, ax, 0x0");
    assert_text(Model::I80186, &[0x6b, 0xdb, 0x03], "imul bx, bx, 0x3");
}

#[test]
fn single_operand_groups() {
    assert_text(Model::I8086, &[0xf7, 0xd0], "not ax");
    assert_text(Model::I8086, &[0xf6, 0xdb], "neg bl");
    assert_text(Model::I8086, &[0xf6, 0xe1], "mul cl");
    assert_text(Model::I8086, &[0xf7, 0x37], "div word [bx]");
    assert_text(Model::I8086, &[0xfe, 0xc8], "dec al");
    assert_text(Model::I8086, &[0xff, 0x36, 0x00, 0x10], "push word [0x1000]");
    assert_text(Model::I8086, &[0x8f, 0xc1], "pop cx");
    assert_text(Model::I80286, &[0x0f, 0x01, 0xe0], "smsw ax");
    assert_text(Model::I80286, &[0x0f, 0x00, 0xd8], "ltr ax");
}

#[test]
fn undefined_renders_as_bad() {
    assert_text(Model::I80286, &[0x0f, 0xff], "(bad)");
    assert_text(Model::I8086, &[0x63], "(bad)");
}
