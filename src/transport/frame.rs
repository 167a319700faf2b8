use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Frame format: one signed 64-bit integer as a zig-zag varint,
/// zero-padded to a fixed 10-byte frame. No length prefix; every
/// message on the wire (and every entry in the snapshot file) is
/// exactly one frame.
pub const FRAME_LEN: usize = 10;

#[derive(thiserror::Error, Debug)]
pub enum FrameError {
    #[error("read frame: {0}")]
    Io(#[from] std::io::Error),
    #[error("stream ended mid-frame after {got} of {FRAME_LEN} bytes")]
    Truncated { got: usize },
    #[error("varint does not fit in 64 bits")]
    Overflow,
}

/// Encodes a number into a frame. Varint bytes are little-endian
/// base-128 groups with continuation bits, after zig-zag mapping;
/// unused trailing bytes stay zero.
pub fn encode(number: i64) -> [u8; FRAME_LEN] {
    let mut ux = ((number << 1) ^ (number >> 63)) as u64;
    let mut frame = [0u8; FRAME_LEN];
    let mut i = 0;
    while ux >= 0x80 {
        frame[i] = ux as u8 | 0x80;
        ux >>= 7;
        i += 1;
    }
    frame[i] = ux as u8;
    frame
}

/// Decodes the varint at the start of a frame. Trailing padding after
/// the terminating byte is ignored. A continuation bit still set at the
/// end of the frame, or a tenth byte carrying more than one value bit,
/// means the value would not fit in 64 bits.
pub fn decode(frame: &[u8; FRAME_LEN]) -> Result<i64, FrameError> {
    let mut ux: u64 = 0;
    let mut shift = 0u32;
    for (i, &byte) in frame.iter().enumerate() {
        if byte < 0x80 {
            if i == FRAME_LEN - 1 && byte > 1 {
                return Err(FrameError::Overflow);
            }
            ux |= (byte as u64) << shift;
            let n = (ux >> 1) as i64;
            return Ok(if ux & 1 != 0 { !n } else { n });
        }
        ux |= ((byte & 0x7f) as u64) << shift;
        shift += 7;
    }
    Err(FrameError::Overflow)
}

/// Reads one frame from the stream.
///
/// Returns `Ok(None)` on a clean end of stream (zero bytes at a frame
/// boundary). A stream that ends partway through a frame is a protocol
/// error, not an EOF.
pub async fn read_number<R>(reader: &mut R) -> Result<Option<i64>, FrameError>
where
    R: AsyncRead + Unpin,
{
    let mut frame = [0u8; FRAME_LEN];
    let mut got = 0;
    while got < FRAME_LEN {
        let n = reader.read(&mut frame[got..]).await?;
        if n == 0 {
            if got == 0 {
                return Ok(None);
            }
            return Err(FrameError::Truncated { got });
        }
        got += n;
    }
    decode(&frame).map(Some)
}

/// Writes one frame to the stream.
pub async fn write_number<W>(writer: &mut W, number: i64) -> Result<(), std::io::Error>
where
    W: AsyncWrite + Unpin,
{
    writer.write_all(&encode(number)).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips() {
        for n in [0i64, 1, -1, 2, -2, 63, 64, -64, -65, 1000, i64::MAX, i64::MIN] {
            let frame = encode(n);
            assert_eq!(decode(&frame).unwrap(), n, "value {n}");
        }
    }

    #[test]
    fn zigzag_layout() {
        // small magnitudes use a single byte: 0, -1, 1, -2, 2, ...
        assert_eq!(encode(0)[0], 0);
        assert_eq!(encode(-1)[0], 1);
        assert_eq!(encode(1)[0], 2);
        assert_eq!(encode(-2)[0], 3);
    }

    #[test]
    fn extremes_fill_the_frame() {
        let frame = encode(i64::MIN);
        assert!(frame[..9].iter().all(|b| b & 0x80 != 0));
        assert_eq!(frame[9], 1);
    }

    #[test]
    fn unterminated_varint_overflows() {
        let frame = [0xffu8; FRAME_LEN];
        assert!(matches!(decode(&frame), Err(FrameError::Overflow)));
    }

    #[test]
    fn oversized_terminator_overflows() {
        let mut frame = [0x80u8; FRAME_LEN];
        frame[FRAME_LEN - 1] = 2;
        assert!(matches!(decode(&frame), Err(FrameError::Overflow)));
    }

    #[tokio::test]
    async fn reads_clean_eof() {
        let mut stream: &[u8] = &[];
        assert!(read_number(&mut stream).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn reads_back_to_back_frames() {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&encode(3));
        bytes.extend_from_slice(&encode(-7));
        let mut stream: &[u8] = &bytes;

        assert_eq!(read_number(&mut stream).await.unwrap(), Some(3));
        assert_eq!(read_number(&mut stream).await.unwrap(), Some(-7));
        assert_eq!(read_number(&mut stream).await.unwrap(), None);
    }

    #[tokio::test]
    async fn partial_frame_is_an_error() {
        let frame = encode(42);
        let mut stream: &[u8] = &frame[..4];
        assert!(matches!(
            read_number(&mut stream).await,
            Err(FrameError::Truncated { got: 4 })
        ));
    }
}
