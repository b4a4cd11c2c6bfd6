// SPDX-License-Identifier: GPL-3.0-or-later

//! The fixed host-function and global-getter catalogue. Each `programs.json` entry names
//! its globals/functions by symbol; the prototype loader resolves those
//! names against [`HostTable`] once, at load time, storing the resolved
//! function pointers directly on the [`Program`](super::Program) so the
//! bytecode itself only ever carries small integer indices.

use super::vm::VmState;
use std::collections::HashMap;

/// A global getter pushes exactly one value onto the stack and reports success.
pub type GlobalGetter = fn(&mut VmState) -> bool;
/// A host function may push/pop stack entries; it reports success/failure.
pub type HostFn = fn(&mut VmState) -> bool;

fn get_tick(state: &mut VmState) -> bool {
    if state.sp >= super::vm::MAX_STACK {
        return false;
    }
    state.stack[state.sp] = state.env.tick() as f32;
    state.sp += 1;
    true
}

fn get_random(state: &mut VmState) -> bool {
    if state.sp >= super::vm::MAX_STACK {
        return false;
    }
    state.stack[state.sp] = state.env.random();
    state.sp += 1;
    true
}

fn get_screen_width(state: &mut VmState) -> bool {
    push(state, state.env.screen_width() as f32)
}
fn get_screen_height(state: &mut VmState) -> bool {
    push(state, state.env.screen_height() as f32)
}
fn get_workarea_left(state: &mut VmState) -> bool {
    push(state, state.env.workarea_left() as f32)
}
fn get_workarea_right(state: &mut VmState) -> bool {
    push(state, state.env.workarea_right() as f32)
}
fn get_workarea_top(state: &mut VmState) -> bool {
    push(state, state.env.workarea_top() as f32)
}
fn get_workarea_bottom(state: &mut VmState) -> bool {
    push(state, state.env.workarea_bottom() as f32)
}
fn get_pointer_x(state: &mut VmState) -> bool {
    push(state, state.env.pointer_x() as f32)
}
fn get_pointer_y(state: &mut VmState) -> bool {
    push(state, state.env.pointer_y() as f32)
}
fn get_ie_active(state: &mut VmState) -> bool {
    push(state, state.env.ie_active() as i32 as f32)
}

fn push(state: &mut VmState, value: f32) -> bool {
    if state.sp >= super::vm::MAX_STACK {
        return false;
    }
    state.stack[state.sp] = value;
    state.sp += 1;
    true
}

fn fn_abs(state: &mut VmState) -> bool {
    unary(state, f32::abs)
}
fn fn_floor(state: &mut VmState) -> bool {
    unary(state, f32::floor)
}
fn fn_ceil(state: &mut VmState) -> bool {
    unary(state, f32::ceil)
}
fn fn_round(state: &mut VmState) -> bool {
    unary(state, f32::round)
}
fn fn_sqrt(state: &mut VmState) -> bool {
    unary(state, f32::sqrt)
}
fn fn_sign(state: &mut VmState) -> bool {
    unary(state, f32::signum)
}

fn unary(state: &mut VmState, f: fn(f32) -> f32) -> bool {
    if state.sp < 2 {
        return false;
    }
    state.stack[state.sp - 1] = f(state.stack[state.sp - 1]);
    true
}

fn fn_min(state: &mut VmState) -> bool {
    binary(state, f32::min)
}
fn fn_max(state: &mut VmState) -> bool {
    binary(state, f32::max)
}

fn binary(state: &mut VmState, f: fn(f32, f32) -> f32) -> bool {
    if state.sp < 3 {
        return false;
    }
    let a = state.stack[state.sp - 2];
    let b = state.stack[state.sp - 1];
    state.stack[state.sp - 2] = f(a, b);
    state.sp -= 1;
    true
}

fn fn_clamp(state: &mut VmState) -> bool {
    if state.sp < 4 {
        return false;
    }
    let v = state.stack[state.sp - 3];
    let lo = state.stack[state.sp - 2];
    let hi = state.stack[state.sp - 1];
    state.stack[state.sp - 3] = v.max(lo).min(hi);
    state.sp -= 2;
    true
}

/// Name-indexed catalogue of global getters and host functions, resolved
/// once per loaded package. Additional symbols can be registered without
/// touching the bytecode format.
pub struct HostTable {
    globals: HashMap<&'static str, GlobalGetter>,
    functions: HashMap<&'static str, HostFn>,
}

impl HostTable {
    pub fn global(&self, name: &str) -> Option<GlobalGetter> {
        self.globals.get(name).copied()
    }

    pub fn function(&self, name: &str) -> Option<HostFn> {
        self.functions.get(name).copied()
    }
}

lazy_static::lazy_static! {
    /// The process-wide fixed catalogue, analogous to `global_symbols.h`.
    pub static ref HOST_TABLE: HostTable = {
        let mut globals: HashMap<&'static str, GlobalGetter> = HashMap::new();
        globals.insert("Tick", get_tick as GlobalGetter);
        globals.insert("Random", get_random as GlobalGetter);
        globals.insert("ScreenWidth", get_screen_width as GlobalGetter);
        globals.insert("ScreenHeight", get_screen_height as GlobalGetter);
        globals.insert("WorkareaLeft", get_workarea_left as GlobalGetter);
        globals.insert("WorkareaRight", get_workarea_right as GlobalGetter);
        globals.insert("WorkareaTop", get_workarea_top as GlobalGetter);
        globals.insert("WorkareaBottom", get_workarea_bottom as GlobalGetter);
        globals.insert("PointerX", get_pointer_x as GlobalGetter);
        globals.insert("PointerY", get_pointer_y as GlobalGetter);
        globals.insert("IeActive", get_ie_active as GlobalGetter);

        let mut functions: HashMap<&'static str, HostFn> = HashMap::new();
        functions.insert("abs", fn_abs as HostFn);
        functions.insert("floor", fn_floor as HostFn);
        functions.insert("ceil", fn_ceil as HostFn);
        functions.insert("round", fn_round as HostFn);
        functions.insert("sqrt", fn_sqrt as HostFn);
        functions.insert("sign", fn_sign as HostFn);
        functions.insert("min", fn_min as HostFn);
        functions.insert("max", fn_max as HostFn);
        functions.insert("clamp", fn_clamp as HostFn);

        HostTable { globals, functions }
    };
}
