// Copyright 2025 Eric Jingryd (tidynest@proton.me)
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Windows `WH_KEYBOARD_LL` hook and `SendInput` backend
//!
//! The hook procedure is a plain `extern "system"` function, so the
//! dispatcher it drives lives in a thread-local slot on the thread that
//! installed the hook (the thread Windows calls the procedure on).
//!
//! Safety rules at the FFI boundary:
//! - Panics are caught; the event is then passed on unchanged
//! - `ncode < 0` and null `lparam` go straight to `CallNextHookEx`
//! - A re-entrant call (dispatcher already borrowed) forwards the event

#![allow(unsafe_code)]

use std::cell::RefCell;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::Path;
use std::sync::atomic::{AtomicIsize, Ordering};
use tracing::{error, info, warn};
use windows::core::PWSTR;
use windows::Win32::Foundation::{CloseHandle, HWND, LPARAM, LRESULT, WPARAM};
use windows::Win32::System::Threading::{
    OpenProcess, QueryFullProcessImageNameW, PROCESS_NAME_WIN32,
    PROCESS_QUERY_LIMITED_INFORMATION,
};
use windows::Win32::UI::Input::KeyboardAndMouse::{
    GetAsyncKeyState, MapVirtualKeyW, SendInput, INPUT, INPUT_0, INPUT_KEYBOARD, KEYBDINPUT,
    KEYBD_EVENT_FLAGS, KEYEVENTF_EXTENDEDKEY, KEYEVENTF_KEYUP, MAPVK_VK_TO_VSC, VIRTUAL_KEY,
};
use windows::Win32::UI::WindowsAndMessaging::{
    CallNextHookEx, DispatchMessageW, GetForegroundWindow, GetGUIThreadInfo, GetMessageW,
    GetWindowThreadProcessId, SetWindowsHookExW, TranslateMessage, UnhookWindowsHookEx,
    GUITHREADINFO, HHOOK, KBDLLHOOKSTRUCT, MSG, WH_KEYBOARD_LL, WM_KEYDOWN, WM_SYSKEYDOWN,
};

use crate::core::types::KeyCode;
use crate::engine::EngineError;
use crate::hook::{Disposition, HookDispatcher, InputBackend, KeyEvent, KeyTransition, TableHandle};
use crate::platform::InstalledHook;

/// Handle of the installed hook, 0 when none
static HOOK: AtomicIsize = AtomicIsize::new(0);

thread_local! {
    static DISPATCHER: RefCell<Option<HookDispatcher<WinBackend>>> = const { RefCell::new(None) };
}

/// Injection and key-state queries through the Win32 API
#[derive(Debug, Default)]
pub struct WinBackend;

impl InputBackend for WinBackend {
    fn send_input(&mut self, events: &[KeyEvent]) -> usize {
        let inputs: Vec<INPUT> = events.iter().map(to_input).collect();
        // SAFETY: `inputs` is a live slice of fully initialised INPUT values
        let sent = unsafe { SendInput(&inputs, std::mem::size_of::<INPUT>() as i32) };
        sent as usize
    }

    fn is_key_held(&self, key: KeyCode) -> bool {
        let Ok(vk) = i32::try_from(key.0) else {
            return false;
        };
        // SAFETY: no pointers involved
        unsafe { GetAsyncKeyState(vk) < 0 }
    }

    fn foreground_process(&self) -> Option<String> {
        // SAFETY: every handle opened here is closed before returning
        unsafe {
            let foreground = GetForegroundWindow();
            if foreground.is_invalid() {
                return None;
            }
            process_name(focused_window(foreground))
        }
    }
}

/// Window holding keyboard focus on the foreground window's GUI thread.
///
/// Hosted applications (e.g. UWP apps inside ApplicationFrameHost) have the
/// frame as foreground window but keyboard focus in their own window.
unsafe fn focused_window(foreground: HWND) -> HWND {
    let thread = GetWindowThreadProcessId(foreground, None);
    if thread == 0 {
        return foreground;
    }

    let mut info = GUITHREADINFO {
        cbSize: std::mem::size_of::<GUITHREADINFO>() as u32,
        ..Default::default()
    };
    match GetGUIThreadInfo(thread, &mut info) {
        Ok(()) => focus_or_foreground(foreground, info.hwndFocus),
        Err(_) => foreground,
    }
}

fn focus_or_foreground(foreground: HWND, focus: HWND) -> HWND {
    if focus.is_invalid() {
        foreground
    } else {
        focus
    }
}

/// Executable file name of the process owning `window`.
unsafe fn process_name(window: HWND) -> Option<String> {
    let mut pid = 0u32;
    GetWindowThreadProcessId(window, Some(&mut pid as *mut u32));
    if pid == 0 {
        return None;
    }

    let process = OpenProcess(PROCESS_QUERY_LIMITED_INFORMATION, false, pid).ok()?;
    let mut buffer = [0u16; 1024];
    let mut len = buffer.len() as u32;
    let queried = QueryFullProcessImageNameW(
        process,
        PROCESS_NAME_WIN32,
        PWSTR(buffer.as_mut_ptr()),
        &mut len,
    );
    let _ = CloseHandle(process);
    queried.ok()?;

    let full_path = String::from_utf16_lossy(&buffer[..len as usize]);
    Path::new(&full_path)
        .file_name()
        .map(|name| name.to_string_lossy().to_lowercase())
}

fn to_input(event: &KeyEvent) -> INPUT {
    let vk = event.key.0 as u16;
    let mut flags = KEYBD_EVENT_FLAGS(0);
    if event.transition == KeyTransition::Up {
        flags |= KEYEVENTF_KEYUP;
    }
    if is_extended(event.key) {
        flags |= KEYEVENTF_EXTENDEDKEY;
    }

    let scan = if event.scan_code != 0 {
        event.scan_code as u16
    } else {
        // SAFETY: no pointers involved
        unsafe { MapVirtualKeyW(u32::from(vk), MAPVK_VK_TO_VSC) as u16 }
    };

    INPUT {
        r#type: INPUT_KEYBOARD,
        Anonymous: INPUT_0 {
            ki: KEYBDINPUT {
                wVk: VIRTUAL_KEY(vk),
                wScan: scan,
                dwFlags: flags,
                time: 0,
                dwExtraInfo: event.extra_info,
            },
        },
    }
}

/// Keys on the extended part of the keyboard need the extended flag, or
/// applications see the numpad variant.
fn is_extended(key: KeyCode) -> bool {
    matches!(
        key.0,
        0x21..=0x28 // PageUp, PageDown, End, Home, arrows
            | 0x2D | 0x2E // Insert, Delete
            | 0x5B | 0x5C | 0x5D // LWin, RWin, Apps
            | 0x6F // Numpad divide
            | 0x90 // NumLock
            | 0xA3 | 0xA5 // RCtrl, RAlt
    )
}

/// An installed low-level keyboard hook
pub struct KeyboardHook {
    handle: Option<HHOOK>,
}

impl KeyboardHook {
    /// Installs the hook and a fresh dispatcher on the calling thread.
    pub fn install(tables: TableHandle) -> Result<Self, EngineError> {
        if HOOK.load(Ordering::SeqCst) != 0 {
            return Err(EngineError::HookInstall(
                "a keyboard hook is already installed".to_string(),
            ));
        }

        DISPATCHER.with(|slot| {
            *slot.borrow_mut() = Some(HookDispatcher::new(WinBackend, tables));
        });

        // SAFETY: `low_level_keyboard_proc` matches HOOKPROC and never unwinds
        let handle = unsafe {
            SetWindowsHookExW(WH_KEYBOARD_LL, Some(low_level_keyboard_proc), None, 0)
        };

        match handle {
            Ok(handle) => {
                HOOK.store(handle.0 as isize, Ordering::SeqCst);
                info!("Keyboard hook installed");
                Ok(Self {
                    handle: Some(handle),
                })
            }
            Err(e) => {
                DISPATCHER.with(|slot| slot.borrow_mut().take());
                Err(EngineError::HookInstall(e.to_string()))
            }
        }
    }
}

impl InstalledHook for KeyboardHook {
    fn uninstall(&mut self) -> Result<(), EngineError> {
        let Some(handle) = self.handle.take() else {
            return Ok(());
        };

        DISPATCHER.with(|slot| {
            if let Ok(mut dispatcher) = slot.try_borrow_mut() {
                if let Some(dispatcher) = dispatcher.as_mut() {
                    dispatcher.release_all();
                }
                *dispatcher = None;
            }
        });

        HOOK.store(0, Ordering::SeqCst);
        // SAFETY: `handle` came from SetWindowsHookExW and is unhooked once
        unsafe { UnhookWindowsHookEx(handle) }
            .map_err(|e| EngineError::HookUninstall(e.to_string()))?;

        info!("Keyboard hook removed");
        Ok(())
    }
}

impl Drop for KeyboardHook {
    fn drop(&mut self) {
        if let Err(e) = self.uninstall() {
            warn!("Failed to remove keyboard hook: {}", e);
        }
    }
}

/// Pumps messages until `WM_QUIT`; hook callbacks run from inside this loop.
pub fn run_message_loop() {
    let mut msg = MSG::default();
    // SAFETY: `msg` outlives every call that receives a pointer to it
    unsafe {
        while GetMessageW(&mut msg, None, 0, 0).as_bool() {
            let _ = TranslateMessage(&msg);
            DispatchMessageW(&msg);
        }
    }
}

unsafe extern "system" fn low_level_keyboard_proc(
    ncode: i32,
    wparam: WPARAM,
    lparam: LPARAM,
) -> LRESULT {
    let hook = HHOOK(HOOK.load(Ordering::SeqCst) as *mut _);
    if ncode < 0 || lparam.0 == 0 {
        return CallNextHookEx(Some(hook), ncode, wparam, lparam);
    }

    let info = *(lparam.0 as *const KBDLLHOOKSTRUCT);
    let transition = match wparam.0 as u32 {
        WM_KEYDOWN | WM_SYSKEYDOWN => KeyTransition::Down,
        _ => KeyTransition::Up,
    };
    let event = KeyEvent {
        key: KeyCode(info.vkCode),
        transition,
        scan_code: info.scanCode,
        extra_info: info.dwExtraInfo,
    };

    let result = catch_unwind(AssertUnwindSafe(|| {
        DISPATCHER.with(|slot| match slot.try_borrow_mut() {
            Ok(mut dispatcher) => dispatcher
                .as_mut()
                .map_or(Disposition::Forward, |d| d.handle(event)),
            Err(_) => Disposition::Forward,
        })
    }));

    match result {
        Ok(Disposition::Suppress) => LRESULT(1),
        Ok(Disposition::Forward) => CallNextHookEx(Some(hook), ncode, wparam, lparam),
        Err(e) => {
            error!("Panic in keyboard hook: {:?}", e);
            CallNextHookEx(Some(hook), ncode, wparam, lparam)
        }
    }
}
