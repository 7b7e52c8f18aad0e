//! SDP answer patching.
//!
//! After `createAnswer` and before `setLocalDescription`, every `m=audio`
//! media section is pinned to low-latency, bidirectional packetization:
//! `a=sendrecv`, `a=ptime:20`, `a=maxptime:20` are appended immediately
//! after each `m=audio` line. No other part of the SDP is touched.

const PATCH_LINES: [&str; 3] = ["a=sendrecv", "a=ptime:20", "a=maxptime:20"];

/// Applies the low-latency audio patch to `sdp`, returning the patched
/// text. Idempotent: lines already bearing the patch are left alone
/// rather than duplicated, so applying this twice in a row is a no-op on
/// the second pass (new `m=audio` sections introduced between calls still
/// get patched).
#[must_use]
pub fn patch_audio_answer(sdp: &str) -> String {
    let lines: Vec<&str> = sdp.split("\r\n").collect();
    // `split` on a string ending in "\r\n" yields a trailing "" element;
    // drop it so we control the final terminator ourselves.
    let lines: Vec<&str> = if lines.last() == Some(&"") {
        lines[..lines.len() - 1].to_vec()
    } else {
        lines
    };

    let mut out: Vec<&str> = Vec::with_capacity(lines.len() + PATCH_LINES.len());
    let mut i = 0;
    while i < lines.len() {
        let line = lines[i];
        out.push(line);
        if line.starts_with("m=audio") {
            let already_patched = PATCH_LINES.iter().enumerate().all(
                |(offset, expected)| {
                    lines.get(i + 1 + offset) == Some(expected)
                },
            );
            if already_patched {
                i += 1 + PATCH_LINES.len();
                out.extend_from_slice(&lines[i - PATCH_LINES.len()..i]);
                continue;
            }
            out.extend_from_slice(&PATCH_LINES);
        }
        i += 1;
    }

    let mut result = out.join("\r\n");
    result.push_str("\r\n");
    result
}
