//! 文档栅格化
//!
//! 把存储的文件（PDF 或位图）统一转成有序的页图序列，
//! 题面和学生提交页都走这一个入口。
//!
//! PDF 依赖系统 pdfium 动态库：绑定失败返回空列表（软失败），
//! 调用方必须把空列表当作"没有可用图片"处理，而不是错误。
//! 非 PDF 文件只做字节透传，不解码校验，字节正确性归存储层管。

use std::io::Cursor;
use std::path::Path;

use pdfium_render::prelude::*;
use tracing::warn;

use crate::errors::{AutoGradeError, Result};

/// PDF 页面渲染放大倍数
const PDF_RENDER_SCALE: f32 = 2.0;

/// 一页图像及其 MIME 类型
#[derive(Debug, Clone)]
pub struct PageImage {
    pub bytes: Vec<u8>,
    pub mime: String,
}

/// 把文件栅格化为有序页图列表
///
/// 文件不存在返回 FileOperation 错误，向调用方传播。
pub fn rasterize_document(path: &Path) -> Result<Vec<PageImage>> {
    if !path.exists() {
        return Err(AutoGradeError::file_operation(format!(
            "文件不存在: {}",
            path.display()
        )));
    }

    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();

    if ext == "pdf" {
        return rasterize_pdf(path);
    }

    let bytes = std::fs::read(path)
        .map_err(|e| AutoGradeError::file_operation(format!("读取文件失败: {e}")))?;
    let mime = match ext.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "webp" => "image/webp",
        "gif" => "image/gif",
        _ => "image/png",
    };

    Ok(vec![PageImage {
        bytes,
        mime: mime.to_string(),
    }])
}

/// 按固定放大倍数逐页渲染 PDF 并编码为 PNG
fn rasterize_pdf(path: &Path) -> Result<Vec<PageImage>> {
    let bindings = match Pdfium::bind_to_system_library() {
        Ok(bindings) => bindings,
        Err(e) => {
            // pdfium 库不可用是软失败：返回空列表而不是错误
            warn!("无法绑定 pdfium 库，跳过 PDF 渲染: {e:?}");
            return Ok(Vec::new());
        }
    };
    let pdfium = Pdfium::new(bindings);

    let document = pdfium
        .load_pdf_from_file(path, None)
        .map_err(|e| AutoGradeError::file_operation(format!("加载 PDF 失败: {e:?}")))?;

    let render_config = PdfRenderConfig::new().scale_page_by_factor(PDF_RENDER_SCALE);

    let mut images = Vec::new();
    for page in document.pages().iter() {
        let bitmap = page
            .render_with_config(&render_config)
            .map_err(|e| AutoGradeError::file_operation(format!("渲染 PDF 页面失败: {e:?}")))?;

        let mut buffer = Cursor::new(Vec::new());
        bitmap
            .as_image()
            .write_to(&mut buffer, image::ImageOutputFormat::Png)
            .map_err(|e| AutoGradeError::file_operation(format!("编码 PNG 失败: {e}")))?;

        images.push(PageImage {
            bytes: buffer.into_inner(),
            mime: "image/png".to_string(),
        });
    }

    Ok(images)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_jpeg_passthrough_single_element() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("page.jpg");
        let payload = b"\xff\xd8\xff\xe0fake-jpeg-bytes";
        std::fs::File::create(&path)
            .unwrap()
            .write_all(payload)
            .unwrap();

        let images = rasterize_document(&path).unwrap();
        assert_eq!(images.len(), 1);
        assert_eq!(images[0].mime, "image/jpeg");
        assert_eq!(images[0].bytes, payload);
    }

    #[test]
    fn test_extension_mime_dispatch() {
        let dir = tempfile::tempdir().unwrap();
        for (name, mime) in [
            ("a.jpeg", "image/jpeg"),
            ("a.webp", "image/webp"),
            ("a.gif", "image/gif"),
            ("a.png", "image/png"),
            ("a.bmp", "image/png"), // 未知扩展名默认 PNG
            ("a.JPG", "image/jpeg"),
        ] {
            let path = dir.path().join(name);
            std::fs::write(&path, b"bytes").unwrap();
            let images = rasterize_document(&path).unwrap();
            assert_eq!(images.len(), 1, "{name}");
            assert_eq!(images[0].mime, mime, "{name}");
        }
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let err = rasterize_document(Path::new("/nonexistent/answer.png")).unwrap_err();
        assert_eq!(err.code(), crate::errors::AutoGradeError::file_operation("").code());
    }

    #[test]
    fn test_no_content_validation_for_raster_input() {
        // 非 PDF 输入是字节透传：内容不是合法图片也原样返回
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.webp");
        std::fs::write(&path, b"definitely not webp").unwrap();
        let images = rasterize_document(&path).unwrap();
        assert_eq!(images[0].bytes, b"definitely not webp");
    }
}
