use email_encoding::body::Encoding;

use super::header::ContentTransferEncoding;

/// A plain text [`Message`][super::Message] body that has already been encoded.
#[derive(Debug, Clone)]
pub struct Body {
    buf: Vec<u8>,
    encoding: ContentTransferEncoding,
}

impl Body {
    /// Encode the supplied text, making it ready to be sent as a body.
    ///
    /// Line endings are converted to `CRLF`, then the cheapest valid
    /// encoding between `7bit`, `quoted-printable` and `base64` is chosen.
    pub fn new<S: Into<String>>(text: S) -> Self {
        let text = crlf_line_endings(&text.into());

        // the server is never assumed to accept raw utf-8
        let encoding = match Encoding::choose(text.as_str(), false) {
            Encoding::SevenBit => ContentTransferEncoding::SevenBit,
            Encoding::EightBit | Encoding::QuotedPrintable => {
                ContentTransferEncoding::QuotedPrintable
            }
            Encoding::Base64 => ContentTransferEncoding::Base64,
        };

        let buf = match encoding {
            ContentTransferEncoding::SevenBit => text.into_bytes(),
            ContentTransferEncoding::QuotedPrintable => quoted_printable::encode(text.as_bytes()),
            ContentTransferEncoding::Base64 => {
                let mut out =
                    String::with_capacity(email_encoding::body::base64::encoded_len(text.len()));
                // writing into a `String` can't fail
                let _ = email_encoding::body::base64::encode(text.as_bytes(), &mut out);
                out.into_bytes()
            }
        };

        Self { buf, encoding }
    }

    /// Returns the `Content-Transfer-Encoding` of this `Body`.
    #[inline]
    pub fn encoding(&self) -> ContentTransferEncoding {
        self.encoding
    }

    /// Consumes `Body` and returns the inner `Vec<u8>`
    #[inline]
    pub fn into_vec(self) -> Vec<u8> {
        self.buf
    }
}

/// Turns every bare `\n` into `\r\n`, leaving existing `\r\n` alone
fn crlf_line_endings(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + text.len() / 32);
    let mut previous = None;

    for c in text.chars() {
        if c == '\n' && previous != Some('\r') {
            out.push('\r');
        }
        out.push(c);
        previous = Some(c);
    }

    out
}
