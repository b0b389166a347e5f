//! In-page scripts evaluated by the marketplace scraper
//!
//! Every extraction script returns plain JSON so it can be decoded straight
//! into the matching Rust type.

/// Scroll down in steps until the bottom is reached, to trigger lazy loading.
/// Resolves once the accumulated scroll covers the document height.
pub(super) fn auto_scroll_script(step_px: u32, interval_ms: u64) -> String {
    format!(
        r#"new Promise((resolve) => {{
    let total = 0;
    const timer = setInterval(() => {{
        const height = document.body ? document.body.scrollHeight : 0;
        window.scrollBy(0, {step_px});
        total += {step_px};
        if (total >= height - window.innerHeight) {{
            clearInterval(timer);
            resolve(true);
        }}
    }}, {interval_ms});
}})"#
    )
}

/// Product and shop links of every result card on a listing page.
/// A card's shop is only taken when the card has a product link.
pub(super) const LISTING_LINKS: &str = r#"(() => {
    const products = [];
    const shops = [];
    document.querySelectorAll(".bl-product-card-new").forEach((card) => {
        const link = card.querySelector(".bl-thumbnail a")?.href;
        if (!link) return;
        products.push(link);
        const shop = card.querySelector(".bl-product-card-new__store-name a")?.href;
        if (shop) shops.push(shop);
    });
    return { products, shops };
})()"#;

/// Product links and advertised page count of a shop page
pub(super) const SHOP_PAGE: &str = r##"(() => {
    const list = document.querySelector("#merchant-page-product-list");
    const products = [];
    if (list) {
        list.querySelectorAll(".item-product").forEach((item) => {
            const link = item.querySelector("a")?.href;
            if (link) products.push(link);
        });
    }
    const links = [...document.querySelectorAll(
        ".c-ghostblock-pagination .c-ghostblock-pagination__main .c-ghostblock-pagination__list .c-ghostblock-pagination__link"
    )];
    const last = Number(links.at(-1)?.textContent?.trim() || "1");
    return { products, max_page: Number.isFinite(last) && last >= 1 ? Math.floor(last) : 1 };
})()"##;

/// Fields of a product page. Missing elements yield `null`.
pub(super) const PRODUCT_DETAILS: &str = r#"(() => {
    const text = (selector) => document.querySelector(selector)?.textContent?.trim() ?? null;
    const feedbackPositive = text(".c-seller__meta__feedback-url");
    const feedbackTotal = text(".c-seller__meta__feedback-total");
    const condition = [...document.querySelectorAll(".c-information__subtitle")]
        .find((el) => el.innerHTML === "Kondisi Barang")
        ?.nextSibling?.textContent?.trim() ?? null;
    const description = document.querySelector(".c-information__description-txt")
        ?.innerHTML.replace(/<\/?[^>]+(>|$)/g, "\n")
        .replace(/\n+/g, "\n") ?? null;
    const image = (
        document.querySelector(".c-product-gallery__main-image source[type='image/jpeg']")
            ?.getAttribute("srcset")
        ?? document.querySelector(".c-product-gallery__main-image img")?.getAttribute("src")
    )?.replace("small", "large") ?? null;
    return {
        url: window.location.toString(),
        title: text("h1"),
        image,
        originalPrice: text(".c-main-product__price > .c-product-price"),
        discountPrice: text(".c-main-product__price__discount > .c-product-price"),
        discountPercentage: text(".c-main-product__price__discount-percentage"),
        sellerLocation: text(".c-delivery-location__seller .c-delivery-location__name")
            ?? text(".c-seller__city"),
        sellerName: text(".c-seller__name"),
        feedbackPositive: feedbackPositive?.replace(" Feedback Positif", "") ?? null,
        feedbackTotal: feedbackTotal?.replace("dari", "").replace("feedback", "").replace(" ", "") ?? null,
        productInfo: text(".c-main-product__information span"),
        condition,
        processTime: text(".c-seller__meta__pesanan h3"),
        description,
    };
})()"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scroll_script_embeds_parameters() {
        let script = auto_scroll_script(250, 40);
        assert!(script.contains("window.scrollBy(0, 250)"));
        assert!(script.contains("}, 40)"));
    }

    #[test]
    fn shop_script_keeps_id_selector_intact() {
        assert!(SHOP_PAGE.contains(r##"querySelector("#merchant-page-product-list")"##));
        assert!(SHOP_PAGE.trim_end().ends_with("})()"));
        assert!(SHOP_PAGE.contains("max_page"));
    }

    #[test]
    fn extraction_scripts_are_self_invoking() {
        for script in [LISTING_LINKS, SHOP_PAGE, PRODUCT_DETAILS] {
            assert!(script.starts_with("(() => {"));
            assert!(script.ends_with("})()"));
        }
    }
}
