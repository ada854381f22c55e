use crate::Image;
use image::{ExtendedColorType, ImageFormat};
use std::fs::File;
use std::io::{BufWriter, Error, ErrorKind, Write};
use std::path::Path;

pub struct Writer {}

impl Writer {
    /// Binary PPM (P6), alpha dropped.
    pub fn write_ppm<P: AsRef<Path>>(output_path: P, image: &Image) -> Result<(), Error> {
        Writer::validate_pixel_count(image)?;

        let mut file = BufWriter::new(File::create(output_path)?);

        file.write_all(b"P6\n")?;
        file.write_all(format!("{} {}\n", image.padded_width(), image.padded_height()).as_bytes())?;
        file.write_all(b"255\n")?;
        file.write_all(&image.as_rgb8())?;
        file.flush()?;

        Ok(())
    }

    /// PAM (P7) with the RGB_ALPHA tuple type.
    pub fn write_pam<P: AsRef<Path>>(output_path: P, image: &Image) -> Result<(), Error> {
        Writer::validate_pixel_count(image)?;

        let mut file = BufWriter::new(File::create(output_path)?);

        file.write_all(b"P7\n")?;
        file.write_all(format!("WIDTH {}\n", image.padded_width()).as_bytes())?;
        file.write_all(format!("HEIGHT {}\n", image.padded_height()).as_bytes())?;
        file.write_all(b"DEPTH 4\nMAXVAL 255\nTUPLTYPE RGB_ALPHA\nENDHDR\n")?;
        file.write_all(image.pixels())?;
        file.flush()?;

        Ok(())
    }

    pub fn write_png<P: AsRef<Path>>(output_path: P, image: &Image) -> Result<(), Error> {
        Writer::validate_pixel_count(image)?;

        image::save_buffer_with_format(
            output_path,
            image.pixels(),
            image.padded_width(),
            image.padded_height(),
            ExtendedColorType::Rgba8,
            ImageFormat::Png,
        )
        .map_err(|e| Error::new(ErrorKind::Other, e))
    }

    fn validate_pixel_count(image: &Image) -> Result<(), Error> {
        let width = image.padded_width();
        let height = image.padded_height();

        let expected_size = width as usize * height as usize * 4;
        let actual_size = image.pixels().len();

        if expected_size != actual_size {
            return Err(Error::new(
                ErrorKind::InvalidInput,
                format!(
                    "Invalid pixel data size for {}x{} RGBA image: expected {} bytes, got {}",
                    width, height, expected_size, actual_size
                ),
            ));
        }

        Ok(())
    }
}
