//! Browser and Desktop Automation
//!
//! The two OS-level side effects the executors need: opening a URL in the
//! default browser, and driving the application launcher with simulated
//! keystrokes. Both sit behind traits so dispatch tests can record calls
//! instead of touching the desktop.

use std::thread;
use std::time::Duration;

use anyhow::Result;
use arboard::Clipboard;
use rdev::{EventType, Key, simulate};
use tracing::{info, warn};

const KEY_DELAY: Duration = Duration::from_millis(20);
/// Time for the launcher overlay to appear / the typed query to settle.
const LAUNCHER_DELAY: Duration = Duration::from_millis(1000);

/// Opens URLs for the user.
#[cfg_attr(test, mockall::automock)]
pub trait Browser: Send + Sync {
    fn open_url(&self, url: &str) -> Result<()>;
}

/// Launches the operating system's default browser.
pub struct SystemBrowser;

impl Browser for SystemBrowser {
    fn open_url(&self, url: &str) -> Result<()> {
        info!(url, "Opening in default browser");
        open::that(url)?;
        Ok(())
    }
}

/// Launches desktop applications by name.
#[cfg_attr(test, mockall::automock)]
pub trait DesktopAutomation: Send + Sync {
    fn launch(&self, app_name: &str) -> Result<()>;
}

/// Drives the OS application launcher: the Meta key opens it, the app name
/// is pasted from the clipboard, Enter confirms the first match.
pub struct KeystrokeAutomation;

impl DesktopAutomation for KeystrokeAutomation {
    fn launch(&self, app_name: &str) -> Result<()> {
        info!(app = app_name, "Launching via application launcher");
        tap(Key::MetaLeft)?;
        thread::sleep(LAUNCHER_DELAY);
        paste_text(app_name)?;
        thread::sleep(LAUNCHER_DELAY);
        tap(Key::Return)?;
        Ok(())
    }
}

fn press(key: Key) -> Result<()> {
    simulate(&EventType::KeyPress(key)).map_err(|e| anyhow::anyhow!("key press failed: {e:?}"))
}

fn release(key: Key) -> Result<()> {
    simulate(&EventType::KeyRelease(key)).map_err(|e| anyhow::anyhow!("key release failed: {e:?}"))
}

fn tap(key: Key) -> Result<()> {
    press(key)?;
    thread::sleep(KEY_DELAY);
    release(key)
}

fn paste_modifier() -> Key {
    if cfg!(target_os = "macos") {
        Key::MetaLeft
    } else {
        Key::ControlLeft
    }
}

/// Sends the paste chord (modifier + V) through `send`.
///
/// The modifier release is attempted even when the V keystroke fails, so an
/// error can never leave the modifier held down on the user's desktop.
fn paste_chord<F>(send: &mut F) -> Result<()>
where
    F: FnMut(EventType) -> Result<()>,
{
    let modifier = paste_modifier();
    send(EventType::KeyPress(modifier))?;
    thread::sleep(KEY_DELAY);
    let pasted = send(EventType::KeyPress(Key::KeyV)).and_then(|()| {
        thread::sleep(KEY_DELAY);
        send(EventType::KeyRelease(Key::KeyV))
    });
    thread::sleep(KEY_DELAY);
    let released = send(EventType::KeyRelease(modifier));
    pasted?;
    released
}

/// Puts `text` on the clipboard, simulates a paste keystroke, then restores
/// the previous clipboard contents.
fn paste_text(text: &str) -> Result<()> {
    let mut clipboard =
        Clipboard::new().map_err(|e| anyhow::anyhow!("failed to open clipboard: {e}"))?;
    let previous = clipboard.get_text().ok();
    clipboard
        .set_text(text)
        .map_err(|e| anyhow::anyhow!("failed to set clipboard text: {e}"))?;
    thread::sleep(Duration::from_millis(50));

    paste_chord(&mut |event| {
        simulate(&event).map_err(|e| anyhow::anyhow!("key event failed: {e:?}"))
    })?;

    thread::sleep(Duration::from_millis(100));
    if let Some(previous) = previous {
        if let Err(e) = clipboard.set_text(previous) {
            warn!("Failed to restore clipboard: {e}");
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paste_chord_sends_keys_in_order() {
        let mut events = Vec::new();
        paste_chord(&mut |event| {
            events.push(event);
            Ok(())
        })
        .unwrap();

        let modifier = paste_modifier();
        assert_eq!(events.len(), 4);
        assert!(matches!(events[0], EventType::KeyPress(k) if k == modifier));
        assert!(matches!(events[1], EventType::KeyPress(Key::KeyV)));
        assert!(matches!(events[2], EventType::KeyRelease(Key::KeyV)));
        assert!(matches!(events[3], EventType::KeyRelease(k) if k == modifier));
    }

    #[test]
    fn modifier_is_released_when_the_paste_key_fails() {
        let mut events = Vec::new();
        let result = paste_chord(&mut |event| {
            events.push(event);
            if matches!(event, EventType::KeyPress(Key::KeyV)) {
                anyhow::bail!("injection blocked")
            }
            Ok(())
        });

        assert!(result.is_err());
        let modifier = paste_modifier();
        assert!(
            matches!(events.last(), Some(EventType::KeyRelease(k)) if *k == modifier),
            "modifier was left held: {events:?}"
        );
    }
}
