//! 注入页面的脚本
//!
//! 所有 DOM 操作集中在一个函数里，按 `op` 分派；
//! Rust 侧通过 `build_call` 拼出 `(lib)(op, args)` 再交给 `JsExecutor`。

use serde::Serialize;

/// 页面侧操作库
pub const DOM_LIB: &str = r#"
(op, args) => {
    const norm = (s) => (s || '').replace(/\*/g, '').replace(/\s+/g, ' ').trim().toLowerCase();
    const clean = (s) => (s || '').replace(/\s+/g, ' ').trim();
    const isVisible = (el) => !!el && el.offsetParent !== null;
    const DISABLED_CLASS = /(^|\s)(disabled|unavailable|out-of-stock|sold-out|soldout)(\s|$)/i;

    const findContainer = (titles) => {
        const containers = Array.from(document.querySelectorAll('.avp-option'))
            .map((c) => ({ c, t: norm(c.querySelector('.avp-option-title')?.textContent) }))
            .filter((x) => x.t && isVisible(x.c));
        for (const title of titles || []) {
            const wanted = norm(title);
            if (!wanted) continue;
            const hit = containers.find((x) => x.t === wanted)
                || containers.find((x) => x.t.startsWith(wanted))
                || containers.find((x) => x.t.includes(wanted));
            if (hit) return hit.c;
        }
        return null;
    };

    const tagOf = (key, index) => `${key}:${index}`;
    const byTag = (key, index) => document.querySelector(`[data-ao-cand="${tagOf(key, index)}"]`);

    const describe = (el, input, shape, index, key) => {
        el.setAttribute('data-ao-cand', tagOf(key, index));
        const style = window.getComputedStyle(el);
        const cls = typeof el.className === 'string' ? el.className : '';
        const opacity = parseFloat(style.opacity);
        return {
            index,
            shape,
            text: clean(el.textContent),
            value: input ? (input.value ?? null) : null,
            visible: isVisible(el),
            selected: !!(input && input.checked),
            controlDisabled: !!(input && input.disabled),
            opacity: Number.isNaN(opacity) ? 1 : opacity,
            pointerEventsNone: style.pointerEvents === 'none',
            markerDisabled: DISABLED_CLASS.test(cls) || el.hasAttribute('data-disabled'),
            ariaDisabled: el.getAttribute('aria-disabled') === 'true'
                || !!(input && input.getAttribute('aria-disabled') === 'true'),
        };
    };

    const describeSelect = (select, startIndex, key) => {
        const visible = isVisible(select);
        return Array.from(select.options).map((opt, i) => {
            opt.setAttribute('data-ao-cand', tagOf(key, startIndex + i));
            return {
                index: startIndex + i,
                shape: 'select',
                text: clean(opt.textContent),
                value: opt.value ?? null,
                visible,
                selected: select.value === opt.value && opt.selected,
                controlDisabled: opt.disabled || select.disabled,
                opacity: 1,
                pointerEventsNone: false,
                markerDisabled: false,
                ariaDisabled: select.getAttribute('aria-disabled') === 'true',
            };
        });
    };

    const fire = (el, ...types) => types.forEach((t) => el.dispatchEvent(new Event(t, { bubbles: true })));

    if (op === 'snapshot') {
        document.querySelectorAll(`[data-ao-cand^="${args.key}:"]`)
            .forEach((el) => el.removeAttribute('data-ao-cand'));

        const container = findContainer(args.titles);
        const empty = { containerFound: !!container, shape: null, containerDisabled: false, candidates: [] };

        if (container) {
            const ccls = typeof container.className === 'string' ? container.className : '';
            const containerDisabled = DISABLED_CLASS.test(ccls)
                || container.getAttribute('aria-disabled') === 'true'
                || !!container.closest('fieldset[disabled]');
            const within = (sel) => Array.from(container.querySelectorAll(sel));
            const labels = (sel, shape) => within(sel).map((el, i) =>
                describe(el, el.querySelector('input'), shape, i, args.key));

            let shape = null;
            let candidates = [];
            if (within('label.avp-pilloptioncheckwrapper').length) {
                shape = 'pill';
                candidates = labels('label.avp-pilloptioncheckwrapper', shape);
            } else if (within('label.option-avis-swatch-value-label').length) {
                shape = 'swatchDropdown';
                candidates = labels('label.option-avis-swatch-value-label', shape);
            } else if (within('label.avp-productoptionswatchwrapper').length) {
                shape = 'swatch';
                candidates = labels('label.avp-productoptionswatchwrapper', shape);
            } else if (within('select').length) {
                shape = 'select';
                let next = 0;
                for (const select of within('select')) {
                    const opts = describeSelect(select, next, args.key);
                    next += opts.length;
                    candidates.push(...opts);
                }
            } else if (within('input[type="text"], textarea').length) {
                shape = 'textInput';
                const input = within('input[type="text"], textarea')[0];
                const c = describe(input, input, shape, 0, args.key);
                c.text = '';
                c.value = input.value ?? '';
                c.selected = false;
                c.controlDisabled = !!input.disabled || !!input.readOnly;
                candidates = [c];
            }
            return { containerFound: true, shape, containerDisabled, candidates };
        }

        if (!args.globalFallback) return empty;

        const candidates = [];
        let next = 0;
        for (const el of document.querySelectorAll('label.avp-pilloptioncheckwrapper')) {
            if (!isVisible(el)) continue;
            candidates.push(describe(el, el.querySelector('input[type="radio"]'), 'pill', next++, args.key));
        }
        return { containerFound: false, shape: candidates.length ? 'pill' : null, containerDisabled: false, candidates };
    }

    if (op === 'reveal') {
        const container = findContainer(args.titles);
        const trigger = container?.querySelector('label.option-avis-swatch-value-label');
        if (!trigger) return false;
        trigger.scrollIntoView({ block: 'center' });
        trigger.click();
        return true;
    }

    if (op === 'activate') {
        const el = byTag(args.key, args.index);
        if (!el) return false;
        if (el.tagName === 'OPTION') {
            const select = el.closest('select');
            if (!select) return false;
            select.value = el.value;
            el.selected = true;
            fire(select, 'input', 'change');
            return true;
        }
        el.scrollIntoView({ block: 'center' });
        el.click();
        return true;
    }

    if (op === 'fill') {
        const el = byTag(args.key, args.index);
        if (!el) return false;
        el.focus();
        el.value = args.value;
        fire(el, 'input', 'change');
        el.blur();
        return true;
    }

    if (op === 'quantity') {
        const input = document.querySelector('input[name="quantity"], input.quantity__input, input.quantity-input');
        if (!input) return false;
        input.value = String(args.quantity);
        fire(input, 'input', 'change');
        return true;
    }

    if (op === 'submit') {
        const btn = document.querySelector('button.avis-new-addcart-button, button[name="add"]');
        if (!btn || !isVisible(btn)) return 'missing';
        if (btn.disabled || btn.getAttribute('aria-disabled') === 'true') return 'disabled';
        btn.scrollIntoView({ block: 'center' });
        btn.click();
        return 'clicked';
    }

    throw new Error(`unknown op: ${op}`);
}
"#;

/// 拼出一次调用：`(lib)("op", {args})`
pub fn build_call<A: Serialize + ?Sized>(op: &str, args: &A) -> Result<String, serde_json::Error> {
    Ok(format!(
        "({})({}, {})",
        DOM_LIB.trim(),
        serde_json::to_string(op)?,
        serde_json::to_string(args)?
    ))
}
